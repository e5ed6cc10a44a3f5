//! A* pathfinding over the 4-connected tile grid, with path validation and
//! line-of-sight corner cutting.

use std::collections::{HashMap, HashSet};

use grimhold_core::{GridCoord, Passability, SeatColor};
use tracing::error;

use crate::connectivity::{self, FloodFill};
use crate::tiles::{Tile, TileMap};
use crate::visibility;

/// Search node for the A* open and closed lists. Entries live in one arena
/// per search; parents are arena indices forming the reconstruction tree.
#[derive(Clone, Copy, Debug)]
struct AstarEntry {
    at: GridCoord,
    parent: Option<usize>,
    g: u32,
    h: u32,
}

impl AstarEntry {
    fn f_cost(&self) -> u32 {
        self.g + self.h
    }
}

/// Whether a creature moving under the given passability class may enter the
/// tile. `Diggable` admits open ground plus earth the requesting seat could
/// excavate; `Impassable` admits nothing.
fn admissible(tile: &Tile, passability: Passability, color: SeatColor) -> bool {
    match passability {
        Passability::Walkable => tile.passability() == Passability::Walkable,
        Passability::Flyable => matches!(
            tile.passability(),
            Passability::Walkable | Passability::Flyable
        ),
        Passability::Diggable => {
            tile.passability() == Passability::Walkable || tile.is_diggable(color)
        }
        Passability::Impassable => false,
    }
}

/// Computes the shortest tile path from `start` to `goal` inclusive, or an
/// empty sequence when either endpoint is off-map or no route exists.
///
/// Classic A*: Manhattan-distance heuristic toward the goal, unit cost per
/// step, open list scanned linearly for the minimum f. When the flood-fill
/// cache is live, walkable searches between differently-tagged tiles are
/// rejected before any node is expanded.
pub(crate) fn find_path(
    grid: &TileMap,
    flood: &FloodFill,
    start: GridCoord,
    goal: GridCoord,
    passability: Passability,
    color: SeatColor,
) -> Vec<GridCoord> {
    if grid.tile(start).is_none() {
        return Vec::new();
    }

    if flood.is_enabled()
        && passability == Passability::Walkable
        && !connectivity::walkable_path_exists(grid, start, goal)
    {
        return Vec::new();
    }

    if grid.tile(goal).is_none() {
        return Vec::new();
    }

    let mut arena = vec![AstarEntry {
        at: start,
        parent: None,
        g: 0,
        h: start.manhattan_distance(goal),
    }];
    let mut open = vec![0usize];
    let mut open_index: HashMap<GridCoord, usize> = HashMap::new();
    let _ = open_index.insert(start, 0);
    let mut closed: HashSet<GridCoord> = HashSet::new();

    loop {
        if open.is_empty() {
            return Vec::new();
        }

        let mut smallest = 0;
        for (position, &entry) in open.iter().enumerate() {
            if arena[entry].f_cost() < arena[open[smallest]].f_cost() {
                smallest = position;
            }
        }
        let current = open.swap_remove(smallest);
        let current_at = arena[current].at;
        let current_g = arena[current].g;
        let _ = open_index.remove(&current_at);
        let _ = closed.insert(current_at);

        if current_at == goal {
            let mut path = Vec::new();
            let mut cursor = Some(current);
            while let Some(index) = cursor {
                path.push(arena[index].at);
                cursor = arena[index].parent;
            }
            path.reverse();
            return path;
        }

        for neighbor in grid.cardinal_neighbors(current_at) {
            if closed.contains(&neighbor) {
                continue;
            }

            let Some(tile) = grid.tile(neighbor) else {
                continue;
            };
            if !admissible(tile, passability, color) {
                continue;
            }

            let tentative_g = current_g + 1;
            match open_index.get(&neighbor) {
                Some(&existing) => {
                    if tentative_g < arena[existing].g {
                        arena[existing].g = tentative_g;
                        arena[existing].parent = Some(current);
                    }
                }
                None => {
                    let index = arena.len();
                    arena.push(AstarEntry {
                        at: neighbor,
                        parent: Some(current),
                        g: tentative_g,
                        h: neighbor.manhattan_distance(goal),
                    });
                    open.push(index);
                    let _ = open_index.insert(neighbor, index);
                }
            }
        }
    }
}

/// Reports whether every tile of a previously computed path still satisfies
/// the passability class; used to detect paths invalidated by map changes.
///
/// Corridor validation is defined for the movement classes only. A
/// `Diggable` request reaching this function is a corrupted call site, the
/// fatal invariant class: it is logged and the process terminates.
pub(crate) fn path_is_clear(grid: &TileMap, path: &[GridCoord], passability: Passability) -> bool {
    if path.is_empty() {
        return false;
    }

    for &at in path {
        let Some(tile) = grid.tile(at) else {
            return false;
        };

        let clear = match passability {
            Passability::Walkable => tile.passability() == Passability::Walkable,
            Passability::Flyable => matches!(
                tile.passability(),
                Passability::Walkable | Passability::Flyable
            ),
            Passability::Impassable => false,
            Passability::Diggable => {
                error!("path_is_clear invoked with the diggable search class");
                panic!("path_is_clear cannot validate diggable corridors");
            }
        };

        if !clear {
            return false;
        }
    }

    true
}

/// Straightens a 4-connected path by greedily bridging node pairs that share
/// a clear line of sight, dropping the tiles between them.
///
/// A pair is only bridged when the rasterized corridor between the two nodes
/// passes [`path_is_clear`] under the same passability class, so the
/// shortened path never crosses ground the original could not.
pub(crate) fn cut_corners(grid: &TileMap, path: &mut Vec<GridCoord>, passability: Passability) {
    if path.len() <= 3 {
        return;
    }

    let mut result = Vec::with_capacity(path.len());
    result.push(path[0]);

    let mut anchor = 0;
    while anchor + 1 < path.len() {
        let mut reach = anchor + 1;
        let mut probe = anchor + 1;
        while probe < path.len() {
            let corridor = visibility::line_of_sight(grid, path[anchor], path[probe]);
            if corridor.is_empty() || !path_is_clear(grid, &corridor, passability) {
                break;
            }
            reach = probe;
            probe += 1;
        }
        result.push(path[reach]);
        anchor = reach;
    }

    *path = result;
}
