//! Room and trap registries with covered-tile and treasury bookkeeping.

use std::collections::BTreeMap;

use grimhold_core::{GridCoord, RoomId, RoomKind, SeatColor, TrapId, TrapKind};

/// A room laid out over claimed ground.
#[derive(Clone, Debug)]
pub(crate) struct Room {
    id: RoomId,
    kind: RoomKind,
    color: SeatColor,
    covered: Vec<GridCoord>,
    stored_gold: u32,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        kind: RoomKind,
        color: SeatColor,
        covered: Vec<GridCoord>,
    ) -> Self {
        Self {
            id,
            kind,
            color,
            covered,
            stored_gold: 0,
        }
    }

    pub(crate) fn id(&self) -> RoomId {
        self.id
    }

    pub(crate) fn kind(&self) -> RoomKind {
        self.kind
    }

    pub(crate) fn color(&self) -> SeatColor {
        self.color
    }

    pub(crate) fn covered(&self) -> &[GridCoord] {
        &self.covered
    }

    pub(crate) fn stored_gold(&self) -> u32 {
        self.stored_gold
    }

    /// Gold the room can hold; grows and shrinks with its covered area.
    pub(crate) fn gold_capacity(&self) -> u32 {
        self.covered.len() as u32 * self.kind.gold_capacity_per_tile()
    }

    /// Accepts as much of the offered gold as capacity allows, returning the
    /// amount actually stored.
    pub(crate) fn deposit_gold(&mut self, amount: u32) -> u32 {
        let accepted = amount.min(self.gold_capacity().saturating_sub(self.stored_gold));
        self.stored_gold += accepted;
        accepted
    }

    /// Removes up to the requested amount of gold, returning what was taken.
    pub(crate) fn withdraw_gold(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.stored_gold);
        self.stored_gold -= taken;
        taken
    }

    /// Detaches one tile from the room's footprint, reporting whether it was
    /// part of it.
    pub(crate) fn remove_covered_tile(&mut self, at: GridCoord) -> bool {
        if let Some(index) = self.covered.iter().position(|&tile| tile == at) {
            let _ = self.covered.remove(index);
            true
        } else {
            false
        }
    }
}

/// Registry that stores rooms and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct RoomRegistry {
    entries: BTreeMap<RoomId, Room>,
    next_id: u32,
}

impl RoomRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> RoomId {
        let id = RoomId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, room: Room) {
        let _ = self.entries.insert(room.id(), room);
    }

    pub(crate) fn remove(&mut self, id: RoomId) -> Option<Room> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: RoomId) -> Option<&Room> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Room> {
        self.entries.values()
    }

    pub(crate) fn ids(&self) -> Vec<RoomId> {
        self.entries.keys().copied().collect()
    }

    /// Sum of the gold stored in every treasury the seat owns.
    pub(crate) fn total_gold_for(&self, color: SeatColor) -> u32 {
        self.entries
            .values()
            .filter(|room| room.kind() == RoomKind::Treasury && room.color() == color)
            .map(Room::stored_gold)
            .sum()
    }

    /// Spreads a deposit across the seat's treasuries in id order, returning
    /// the amount that found storage. Gold beyond capacity is lost.
    pub(crate) fn deposit_gold_for(&mut self, color: SeatColor, amount: u32) -> u32 {
        let mut remaining = amount;
        for room in self.entries.values_mut() {
            if remaining == 0 {
                break;
            }
            if room.kind() == RoomKind::Treasury && room.color() == color {
                remaining -= room.deposit_gold(remaining);
            }
        }
        amount - remaining
    }

    /// Withdraws the exact amount from the seat's treasuries, oldest first,
    /// or takes nothing when the combined balance falls short.
    pub(crate) fn withdraw_gold_for(&mut self, color: SeatColor, amount: u32) -> bool {
        if self.total_gold_for(color) < amount {
            return false;
        }

        let mut still_needed = amount;
        for room in self.entries.values_mut() {
            if still_needed == 0 {
                break;
            }
            if room.kind() == RoomKind::Treasury && room.color() == color {
                still_needed -= room.withdraw_gold(still_needed);
            }
        }
        true
    }
}

/// A trap buried under claimed ground.
#[derive(Clone, Debug)]
pub(crate) struct Trap {
    id: TrapId,
    kind: TrapKind,
    color: SeatColor,
    covered: Vec<GridCoord>,
    cooldown: u32,
}

impl Trap {
    pub(crate) fn new(
        id: TrapId,
        kind: TrapKind,
        color: SeatColor,
        covered: Vec<GridCoord>,
    ) -> Self {
        Self {
            id,
            kind,
            color,
            covered,
            cooldown: 0,
        }
    }

    pub(crate) fn id(&self) -> TrapId {
        self.id
    }

    pub(crate) fn kind(&self) -> TrapKind {
        self.kind
    }

    pub(crate) fn color(&self) -> SeatColor {
        self.color
    }

    pub(crate) fn covered(&self) -> &[GridCoord] {
        &self.covered
    }

    pub(crate) fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.cooldown == 0
    }

    /// Rests the trap for its kind's cooldown after a triggering.
    pub(crate) fn arm_cooldown(&mut self) {
        self.cooldown = self.kind.cooldown_turns();
    }

    pub(crate) fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }
}

/// Registry that stores traps and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct TrapRegistry {
    entries: BTreeMap<TrapId, Trap>,
    next_id: u32,
}

impl TrapRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> TrapId {
        let id = TrapId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, trap: Trap) {
        let _ = self.entries.insert(trap.id(), trap);
    }

    pub(crate) fn remove(&mut self, id: TrapId) -> Option<Trap> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: TrapId) -> Option<&Trap> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TrapId) -> Option<&mut Trap> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Trap> {
        self.entries.values()
    }
}
