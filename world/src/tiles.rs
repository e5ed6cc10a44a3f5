//! Dense tile grid storage and per-tile terrain state.

use std::collections::BTreeSet;

use grimhold_core::{
    ConnectivityTag, CreatureId, GridCoord, Passability, RoomId, SeatColor, TileKind, TrapId,
};

/// Fullness of completely excavated ground.
pub(crate) const OPEN: f64 = 0.0;
/// Fullness of completely solid ground.
pub(crate) const SOLID: f64 = 1.0;

/// One cell of the map grid.
#[derive(Clone, Debug)]
pub(crate) struct Tile {
    kind: TileKind,
    fullness: f64,
    owner: Option<SeatColor>,
    connectivity: Option<ConnectivityTag>,
    marked_for_digging: BTreeSet<SeatColor>,
    occupants: Vec<CreatureId>,
    covering_room: Option<RoomId>,
    covering_trap: Option<TrapId>,
}

impl Tile {
    pub(crate) fn new(kind: TileKind, fullness: f64) -> Self {
        Self {
            kind,
            fullness,
            owner: None,
            connectivity: None,
            marked_for_digging: BTreeSet::new(),
            occupants: Vec::new(),
            covering_room: None,
            covering_trap: None,
        }
    }

    pub(crate) fn kind(&self) -> TileKind {
        self.kind
    }

    pub(crate) fn fullness(&self) -> f64 {
        self.fullness
    }

    pub(crate) fn owner(&self) -> Option<SeatColor> {
        self.owner
    }

    pub(crate) fn connectivity(&self) -> Option<ConnectivityTag> {
        self.connectivity
    }

    pub(crate) fn set_connectivity(&mut self, tag: Option<ConnectivityTag>) {
        self.connectivity = tag;
    }

    /// Traversal policy derived from terrain and fullness. Solid ground is
    /// impassable regardless of kind; liquids admit fliers only.
    pub(crate) fn passability(&self) -> Passability {
        if self.fullness > OPEN {
            return Passability::Impassable;
        }
        match self.kind {
            TileKind::Water | TileKind::Lava => Passability::Flyable,
            _ => Passability::Walkable,
        }
    }

    /// Whether sight lines pass through the tile. Only solid ground blocks
    /// vision; liquids are as transparent as open floor.
    pub(crate) fn permits_vision(&self) -> bool {
        self.fullness <= OPEN
    }

    /// Whether the given seat may excavate this tile. Claimed walls are
    /// fortified against everyone but their owner; bedrock resists all.
    pub(crate) fn is_diggable(&self, color: SeatColor) -> bool {
        if self.fullness <= OPEN {
            return false;
        }
        match self.kind {
            TileKind::Dirt | TileKind::Gold => true,
            TileKind::Claimed => self.owner == Some(color),
            TileKind::Rock | TileKind::Water | TileKind::Lava => false,
        }
    }

    /// Overwrites terrain wholesale; the map-loader primitive.
    pub(crate) fn set_terrain(&mut self, kind: TileKind, fullness: f64, owner: Option<SeatColor>) {
        self.kind = kind;
        self.fullness = fullness;
        self.owner = owner;
    }

    /// Excavates the tile to open dirt floor, returning the terrain that was
    /// removed. Dig markings are spent by the excavation.
    pub(crate) fn dig(&mut self) -> TileKind {
        let removed = self.kind;
        self.kind = TileKind::Dirt;
        self.fullness = OPEN;
        self.owner = None;
        self.marked_for_digging.clear();
        removed
    }

    /// Converts open ground into the seat's claimed territory.
    pub(crate) fn claim(&mut self, color: SeatColor) {
        self.kind = TileKind::Claimed;
        self.owner = Some(color);
    }

    pub(crate) fn mark_for_digging(&mut self, color: SeatColor, mark: bool) -> bool {
        if mark {
            self.marked_for_digging.insert(color)
        } else {
            self.marked_for_digging.remove(&color)
        }
    }

    pub(crate) fn is_marked_by(&self, color: SeatColor) -> bool {
        self.marked_for_digging.contains(&color)
    }

    pub(crate) fn add_occupant(&mut self, creature: CreatureId) {
        self.occupants.push(creature);
    }

    pub(crate) fn remove_occupant(&mut self, creature: CreatureId) {
        if let Some(index) = self.occupants.iter().position(|&id| id == creature) {
            let _ = self.occupants.remove(index);
        }
    }

    pub(crate) fn occupants(&self) -> &[CreatureId] {
        &self.occupants
    }

    pub(crate) fn covering_room(&self) -> Option<RoomId> {
        self.covering_room
    }

    pub(crate) fn set_covering_room(&mut self, room: Option<RoomId>) {
        self.covering_room = room;
    }

    pub(crate) fn covering_trap(&self) -> Option<TrapId> {
        self.covering_trap
    }

    pub(crate) fn set_covering_trap(&mut self, trap: Option<TrapId>) {
        self.covering_trap = trap;
    }
}

/// Row-major dense storage for the map's tiles.
#[derive(Clone, Debug)]
pub(crate) struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl TileMap {
    /// Creates a fresh map of solid dirt, the blank slate a loader carves.
    pub(crate) fn new(width: u32, height: u32) -> Self {
        let capacity = width as usize * height as usize;
        let mut tiles = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            tiles.push(Tile::new(TileKind::Dirt, SOLID));
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn contains(&self, at: GridCoord) -> bool {
        at.x() >= 0 && at.y() >= 0 && (at.x() as u32) < self.width && (at.y() as u32) < self.height
    }

    fn index(&self, at: GridCoord) -> Option<usize> {
        if self.contains(at) {
            Some(at.y() as usize * self.width as usize + at.x() as usize)
        } else {
            None
        }
    }

    pub(crate) fn tile(&self, at: GridCoord) -> Option<&Tile> {
        self.index(at).map(|index| &self.tiles[index])
    }

    pub(crate) fn tile_mut(&mut self, at: GridCoord) -> Option<&mut Tile> {
        self.index(at).map(move |index| &mut self.tiles[index])
    }

    /// In-bounds 4-neighbors of the given coordinate.
    pub(crate) fn cardinal_neighbors(&self, at: GridCoord) -> NeighborIter {
        let mut neighbors = NeighborIter::default();
        let candidates = [
            GridCoord::new(at.x(), at.y() - 1),
            GridCoord::new(at.x() - 1, at.y()),
            GridCoord::new(at.x() + 1, at.y()),
            GridCoord::new(at.x(), at.y() + 1),
        ];
        for candidate in candidates {
            if self.contains(candidate) {
                neighbors.push(candidate);
            }
        }
        neighbors
    }

    /// Every coordinate of the grid in row-major order.
    pub(crate) fn coords(&self) -> impl Iterator<Item = GridCoord> {
        let width = self.width as i32;
        let height = self.height as i32;
        (0..height).flat_map(move |y| (0..width).map(move |x| GridCoord::new(x, y)))
    }

    /// In-bounds coordinates of the axis-aligned rectangle spanned by two
    /// corners, in row-major order.
    pub(crate) fn rectangular_region(&self, a: GridCoord, b: GridCoord) -> Vec<GridCoord> {
        let min_x = a.x().min(b.x()).max(0);
        let min_y = a.y().min(b.y()).max(0);
        let max_x = a.x().max(b.x()).min(self.width as i32 - 1);
        let max_y = a.y().max(b.y()).min(self.height as i32 - 1);

        let mut region = Vec::new();
        let mut y = min_y;
        while y <= max_y {
            let mut x = min_x;
            while x <= max_x {
                region.push(GridCoord::new(x, y));
                x += 1;
            }
            y += 1;
        }
        region
    }
}

/// Fixed-capacity iterator over a tile's in-bounds cardinal neighbors.
#[derive(Clone, Debug, Default)]
pub(crate) struct NeighborIter {
    buffer: [Option<GridCoord>; 4],
    len: usize,
    cursor: usize,
}

impl NeighborIter {
    fn push(&mut self, at: GridCoord) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = Some(at);
            self.len += 1;
        }
    }
}

impl Iterator for NeighborIter {
    type Item = GridCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.len {
            return None;
        }

        let value = self.buffer[self.cursor];
        self.cursor += 1;
        value
    }
}
