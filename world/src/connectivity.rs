//! Flood-fill connectivity cache answering fast walkable-reachability
//! queries for the pathfinder.
//!
//! Tags partition walkable tiles into connected components. The cache is
//! always rebuilt whole: any mutation that can change connectivity (digging,
//! claiming, terrain overwrites) throws the previous tags away rather than
//! patching them.

use grimhold_core::{ConnectivityTag, GridCoord, Passability};

use crate::tiles::TileMap;

/// Enablement flag and tag allocator for the connectivity cache.
#[derive(Clone, Debug)]
pub(crate) struct FloodFill {
    enabled: bool,
    next_tag: u32,
}

impl FloodFill {
    pub(crate) fn new() -> Self {
        Self {
            enabled: false,
            next_tag: 0,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn enable(&mut self) {
        self.enabled = true;
    }

    /// Tags are allocated from a map-wide counter that never resets, so a
    /// rebuild can never confuse stale tags with fresh ones.
    fn allocate_tag(&mut self) -> ConnectivityTag {
        let tag = ConnectivityTag::new(self.next_tag);
        self.next_tag += 1;
        tag
    }
}

/// Recomputes every connectivity tag from scratch, returning the number of
/// walkable components found. Does nothing while the cache is disabled.
pub(crate) fn rebuild(grid: &mut TileMap, flood: &mut FloodFill) -> u32 {
    if !flood.enabled {
        return 0;
    }

    for at in grid.coords().collect::<Vec<_>>() {
        if let Some(tile) = grid.tile_mut(at) {
            tile.set_connectivity(None);
        }
    }

    let mut components = 0;
    for at in grid.coords().collect::<Vec<_>>() {
        let untagged_walkable = grid
            .tile(at)
            .is_some_and(|tile| tile.connectivity().is_none() && is_floodable(grid, at));
        if untagged_walkable {
            let tag = flood.allocate_tag();
            let _ = flood_component(grid, at, tag);
            components += 1;
        }
    }

    components
}

/// Floods one walkable component from the starting tile, returning the
/// number of tiles tagged. The traversal uses an explicit work stack; the
/// component can be as large as the map.
pub(crate) fn flood_component(grid: &mut TileMap, start: GridCoord, tag: ConnectivityTag) -> u32 {
    if !is_floodable(grid, start) {
        return 0;
    }

    let mut touched = 0;
    let mut work = vec![start];
    while let Some(at) = work.pop() {
        let Some(tile) = grid.tile_mut(at) else {
            continue;
        };
        if tile.connectivity() == Some(tag) {
            continue;
        }
        tile.set_connectivity(Some(tag));
        touched += 1;

        for neighbor in grid.cardinal_neighbors(at) {
            if is_floodable(grid, neighbor) {
                let already = grid
                    .tile(neighbor)
                    .is_some_and(|tile| tile.connectivity() == Some(tag));
                if !already {
                    work.push(neighbor);
                }
            }
        }
    }

    touched
}

/// Fast reachability pre-check: two tiles are walk-connected exactly when
/// both carry the same tag. Untagged (non-walkable or off-map) tiles are
/// connected to nothing.
pub(crate) fn walkable_path_exists(grid: &TileMap, a: GridCoord, b: GridCoord) -> bool {
    let Some(first) = grid.tile(a).and_then(|tile| tile.connectivity()) else {
        return false;
    };
    let Some(second) = grid.tile(b).and_then(|tile| tile.connectivity()) else {
        return false;
    };
    first == second
}

fn is_floodable(grid: &TileMap, at: GridCoord) -> bool {
    grid.tile(at)
        .is_some_and(|tile| tile.passability() == Passability::Walkable)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x3 map with a solid wall down column 1 separating two open pockets.
    fn walled_map() -> TileMap {
        let mut grid = TileMap::new(4, 3);
        for at in grid.coords().collect::<Vec<_>>() {
            if at.x() != 1 {
                let _ = grid.tile_mut(at).expect("tile exists").dig();
            }
        }
        grid
    }

    #[test]
    fn rebuild_does_nothing_while_disabled() {
        let mut grid = walled_map();
        let mut flood = FloodFill::new();

        assert_eq!(rebuild(&mut grid, &mut flood), 0);
        assert!(grid
            .tile(GridCoord::new(0, 0))
            .expect("tile exists")
            .connectivity()
            .is_none());
    }

    #[test]
    fn separated_pockets_receive_distinct_tags() {
        let mut grid = walled_map();
        let mut flood = FloodFill::new();
        flood.enable();

        assert_eq!(rebuild(&mut grid, &mut flood), 2);

        let left = grid
            .tile(GridCoord::new(0, 0))
            .expect("tile exists")
            .connectivity();
        let right = grid
            .tile(GridCoord::new(2, 0))
            .expect("tile exists")
            .connectivity();
        assert!(left.is_some());
        assert!(right.is_some());
        assert_ne!(left, right);

        assert!(walkable_path_exists(
            &grid,
            GridCoord::new(0, 0),
            GridCoord::new(0, 2)
        ));
        assert!(!walkable_path_exists(
            &grid,
            GridCoord::new(0, 0),
            GridCoord::new(2, 0)
        ));
    }

    #[test]
    fn solid_tiles_are_connected_to_nothing() {
        let mut grid = walled_map();
        let mut flood = FloodFill::new();
        flood.enable();
        let _ = rebuild(&mut grid, &mut flood);

        assert!(!walkable_path_exists(
            &grid,
            GridCoord::new(1, 0),
            GridCoord::new(1, 0)
        ));
        assert!(!walkable_path_exists(
            &grid,
            GridCoord::new(0, 0),
            GridCoord::new(7, 7)
        ));
    }

    #[test]
    fn digging_through_the_wall_merges_components_after_rebuild() {
        let mut grid = walled_map();
        let mut flood = FloodFill::new();
        flood.enable();
        let _ = rebuild(&mut grid, &mut flood);

        let _ = grid
            .tile_mut(GridCoord::new(1, 1))
            .expect("tile exists")
            .dig();
        assert_eq!(rebuild(&mut grid, &mut flood), 1);

        assert!(walkable_path_exists(
            &grid,
            GridCoord::new(0, 0),
            GridCoord::new(3, 2)
        ));
    }

    #[test]
    fn tag_allocation_is_monotone_across_rebuilds() {
        let mut grid = walled_map();
        let mut flood = FloodFill::new();
        flood.enable();
        let _ = rebuild(&mut grid, &mut flood);
        let first = grid
            .tile(GridCoord::new(0, 0))
            .expect("tile exists")
            .connectivity()
            .expect("tagged");

        let _ = rebuild(&mut grid, &mut flood);
        let second = grid
            .tile(GridCoord::new(0, 0))
            .expect("tile exists")
            .connectivity()
            .expect("tagged");

        assert!(second.get() > first.get());
    }
}
