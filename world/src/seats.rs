//! Seats (faction slots), players, goals and the winners list.

use grimhold_core::{Goal, GoalStatus, GridCoord, RoomKind, SeatColor, SeatError};

use crate::creatures::CreatureRegistry;
use crate::rooms::RoomRegistry;

/// Mana ceiling a seat can bank.
pub(crate) const MANA_CAP: u32 = 250_000;
/// Mana every seat gains per upkeep before the claimed-tile bonus.
pub(crate) const MANA_BASE_INCOME: u32 = 50;

/// Per-faction resources, goals and bookkeeping. A seat exists whether or
/// not a player is currently bound to it.
#[derive(Clone, Debug)]
pub(crate) struct Seat {
    color: SeatColor,
    faction: String,
    starting: GridCoord,
    gold: u32,
    mana: u32,
    mana_delta: u32,
    claimed_tiles: u32,
    controlled_creatures: u32,
    uncompleted: Vec<Goal>,
    completed: Vec<Goal>,
    failed: Vec<Goal>,
}

impl Seat {
    pub(crate) fn new(color: SeatColor, faction: String, starting: GridCoord) -> Self {
        Self {
            color,
            faction,
            starting,
            gold: 0,
            mana: 0,
            mana_delta: 0,
            claimed_tiles: 0,
            controlled_creatures: 0,
            uncompleted: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub(crate) fn color(&self) -> SeatColor {
        self.color
    }

    pub(crate) fn faction(&self) -> &str {
        &self.faction
    }

    pub(crate) fn starting(&self) -> GridCoord {
        self.starting
    }

    pub(crate) fn gold(&self) -> u32 {
        self.gold
    }

    pub(crate) fn set_gold(&mut self, gold: u32) {
        self.gold = gold;
    }

    pub(crate) fn mana(&self) -> u32 {
        self.mana
    }

    pub(crate) fn mana_delta(&self) -> u32 {
        self.mana_delta
    }

    /// Banks one upkeep's worth of mana: a flat income plus one point per
    /// claimed tile, clamped at the ceiling.
    pub(crate) fn accrue_mana(&mut self) {
        self.mana_delta = MANA_BASE_INCOME + self.claimed_tiles;
        self.mana = (self.mana + self.mana_delta).min(MANA_CAP);
    }

    pub(crate) fn claimed_tiles(&self) -> u32 {
        self.claimed_tiles
    }

    pub(crate) fn reset_claimed_tiles(&mut self) {
        self.claimed_tiles = 0;
    }

    pub(crate) fn increment_claimed_tiles(&mut self) {
        self.claimed_tiles += 1;
    }

    pub(crate) fn controlled_creatures(&self) -> u32 {
        self.controlled_creatures
    }

    pub(crate) fn reset_controlled_creatures(&mut self) {
        self.controlled_creatures = 0;
    }

    pub(crate) fn increment_controlled_creatures(&mut self) {
        self.controlled_creatures += 1;
    }

    pub(crate) fn add_goal(&mut self, goal: Goal) {
        self.uncompleted.push(goal);
    }

    pub(crate) fn uncompleted_goals(&self) -> &[Goal] {
        &self.uncompleted
    }

    pub(crate) fn completed_goals(&self) -> &[Goal] {
        &self.completed
    }

    pub(crate) fn failed_goals(&self) -> &[Goal] {
        &self.failed
    }

    /// Re-examines previously completed goals; conditions that lapsed send
    /// the goal back to the uncompleted list, broken ones to the failed list.
    pub(crate) fn recheck_completed_goals(
        &mut self,
        rooms: &RoomRegistry,
        creatures: &CreatureRegistry,
    ) {
        let completed = std::mem::take(&mut self.completed);
        for goal in completed {
            match evaluate_goal(goal, self, rooms, creatures) {
                GoalStatus::Met => self.completed.push(goal),
                GoalStatus::Unmet => self.uncompleted.push(goal),
                GoalStatus::Failed => self.failed.push(goal),
            }
        }
    }

    /// Evaluates the uncompleted goals, promoting satisfied ones and
    /// condemning broken ones. Returns how many goals remain uncompleted.
    pub(crate) fn check_uncompleted_goals(
        &mut self,
        rooms: &RoomRegistry,
        creatures: &CreatureRegistry,
    ) -> usize {
        let uncompleted = std::mem::take(&mut self.uncompleted);
        for goal in uncompleted {
            match evaluate_goal(goal, self, rooms, creatures) {
                GoalStatus::Met => self.completed.push(goal),
                GoalStatus::Unmet => self.uncompleted.push(goal),
                GoalStatus::Failed => self.failed.push(goal),
            }
        }
        self.uncompleted.len()
    }
}

/// Evaluates one goal for one seat against the live registries.
pub(crate) fn evaluate_goal(
    goal: Goal,
    seat: &Seat,
    rooms: &RoomRegistry,
    creatures: &CreatureRegistry,
) -> GoalStatus {
    match goal {
        Goal::ClaimTiles { count } => {
            if seat.claimed_tiles() >= count {
                GoalStatus::Met
            } else {
                GoalStatus::Unmet
            }
        }
        Goal::AcquireGold { amount } => {
            if seat.gold() >= amount {
                GoalStatus::Met
            } else {
                GoalStatus::Unmet
            }
        }
        Goal::KillAllEnemies => {
            let enemies_remain = creatures
                .iter()
                .any(|creature| creature.color() != seat.color() && creature.is_alive());
            if enemies_remain {
                GoalStatus::Unmet
            } else {
                GoalStatus::Met
            }
        }
        Goal::ProtectTemple => {
            let temple_stands = rooms.iter().any(|room| {
                room.kind() == RoomKind::DungeonTemple && room.color() == seat.color()
            });
            if temple_stands {
                GoalStatus::Met
            } else {
                GoalStatus::Failed
            }
        }
    }
}

/// A human or computer seat-holder. Owns no simulation state beyond the
/// seat reference and a nickname.
#[derive(Clone, Debug)]
pub(crate) struct Player {
    nick: String,
    color: SeatColor,
    is_ai: bool,
}

impl Player {
    pub(crate) fn new(nick: String, color: SeatColor, is_ai: bool) -> Self {
        Self { nick, color, is_ai }
    }

    pub(crate) fn nick(&self) -> &str {
        &self.nick
    }

    pub(crate) fn color(&self) -> SeatColor {
        self.color
    }

    pub(crate) fn is_ai(&self) -> bool {
        self.is_ai
    }
}

/// Registry that keeps seats split between the empty (unbound) and filled
/// (player-bound) sets, plus the winners list.
#[derive(Clone, Debug)]
pub(crate) struct SeatRegistry {
    empty: Vec<Seat>,
    filled: Vec<Seat>,
    winners: Vec<SeatColor>,
}

impl SeatRegistry {
    pub(crate) fn new() -> Self {
        Self {
            empty: Vec::new(),
            filled: Vec::new(),
            winners: Vec::new(),
        }
    }

    /// Registers an unbound seat; colors are unique across both sets.
    pub(crate) fn add_empty(&mut self, seat: Seat) -> Result<(), SeatError> {
        if self.seat_by_color(seat.color()).is_some() {
            return Err(SeatError::DuplicateColor);
        }
        self.empty.push(seat);
        Ok(())
    }

    /// Promotes the empty seat of the given color into the filled set,
    /// reporting whether such a seat existed.
    pub(crate) fn bind(&mut self, color: SeatColor) -> bool {
        if let Some(index) = self.empty.iter().position(|seat| seat.color() == color) {
            let seat = self.empty.remove(index);
            self.filled.push(seat);
            true
        } else {
            false
        }
    }

    /// Demotes the filled seat of the given color back into the empty set,
    /// reporting whether such a seat existed.
    pub(crate) fn release(&mut self, color: SeatColor) -> bool {
        if let Some(index) = self.filled.iter().position(|seat| seat.color() == color) {
            let seat = self.filled.remove(index);
            self.empty.push(seat);
            true
        } else {
            false
        }
    }

    pub(crate) fn seat_by_color(&self, color: SeatColor) -> Option<&Seat> {
        self.filled
            .iter()
            .chain(self.empty.iter())
            .find(|seat| seat.color() == color)
    }

    pub(crate) fn seat_by_color_mut(&mut self, color: SeatColor) -> Option<&mut Seat> {
        self.filled
            .iter_mut()
            .chain(self.empty.iter_mut())
            .find(|seat| seat.color() == color)
    }

    pub(crate) fn filled(&self) -> &[Seat] {
        &self.filled
    }

    pub(crate) fn filled_mut(&mut self) -> &mut [Seat] {
        &mut self.filled
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &Seat> {
        self.filled.iter().chain(self.empty.iter())
    }

    pub(crate) fn all_mut(&mut self) -> impl Iterator<Item = &mut Seat> {
        self.filled.iter_mut().chain(self.empty.iter_mut())
    }

    /// Adds a seat to the winners list; seats stay winners once listed.
    /// Returns whether the color was newly added.
    pub(crate) fn add_winner(&mut self, color: SeatColor) -> bool {
        if self.winners.contains(&color) {
            false
        } else {
            self.winners.push(color);
            true
        }
    }

    pub(crate) fn is_winner(&self, color: SeatColor) -> bool {
        self.winners.contains(&color)
    }

    pub(crate) fn winners(&self) -> &[SeatColor] {
        &self.winners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::Room;
    use grimhold_core::RoomId;

    fn seat(color: u32) -> Seat {
        Seat::new(SeatColor::new(color), "keeper".to_owned(), GridCoord::new(0, 0))
    }

    #[test]
    fn duplicate_colors_are_rejected_across_both_sets() {
        let mut registry = SeatRegistry::new();
        registry.add_empty(seat(1)).expect("first seat");
        assert!(registry.bind(SeatColor::new(1)));

        assert_eq!(
            registry.add_empty(seat(1)),
            Err(SeatError::DuplicateColor)
        );
        registry.add_empty(seat(2)).expect("second seat");
    }

    #[test]
    fn binding_and_releasing_moves_seats_between_sets() {
        let mut registry = SeatRegistry::new();
        registry.add_empty(seat(1)).expect("seat added");

        assert!(registry.bind(SeatColor::new(1)));
        assert_eq!(registry.filled().len(), 1);
        assert!(!registry.bind(SeatColor::new(1)));

        assert!(registry.release(SeatColor::new(1)));
        assert!(registry.filled().is_empty());
        assert!(!registry.release(SeatColor::new(1)));
    }

    #[test]
    fn mana_accrual_adds_income_plus_claimed_tiles_and_clamps() {
        let mut seat = seat(1);
        for _ in 0..10 {
            seat.increment_claimed_tiles();
        }

        seat.accrue_mana();
        assert_eq!(seat.mana(), 60);
        assert_eq!(seat.mana_delta(), 60);

        for _ in 0..10_000 {
            seat.accrue_mana();
        }
        assert_eq!(seat.mana(), MANA_CAP);
    }

    #[test]
    fn claim_and_gold_goals_track_seat_resources() {
        let rooms = RoomRegistry::new();
        let creatures = CreatureRegistry::new();
        let mut seat = seat(1);
        seat.add_goal(Goal::ClaimTiles { count: 2 });
        seat.add_goal(Goal::AcquireGold { amount: 100 });

        assert_eq!(seat.check_uncompleted_goals(&rooms, &creatures), 2);

        seat.increment_claimed_tiles();
        seat.increment_claimed_tiles();
        seat.set_gold(150);
        assert_eq!(seat.check_uncompleted_goals(&rooms, &creatures), 0);
        assert_eq!(seat.completed_goals().len(), 2);
    }

    #[test]
    fn lapsed_completed_goals_return_to_the_uncompleted_list() {
        let rooms = RoomRegistry::new();
        let creatures = CreatureRegistry::new();
        let mut seat = seat(1);
        seat.set_gold(100);
        seat.add_goal(Goal::AcquireGold { amount: 100 });
        assert_eq!(seat.check_uncompleted_goals(&rooms, &creatures), 0);

        seat.set_gold(0);
        seat.recheck_completed_goals(&rooms, &creatures);

        assert!(seat.completed_goals().is_empty());
        assert_eq!(seat.uncompleted_goals().len(), 1);
    }

    #[test]
    fn losing_the_last_temple_fails_the_protect_goal_permanently() {
        let mut rooms = RoomRegistry::new();
        let creatures = CreatureRegistry::new();
        let color = SeatColor::new(1);
        let id = rooms.allocate_id();
        rooms.insert(Room::new(
            id,
            RoomKind::DungeonTemple,
            color,
            vec![GridCoord::new(0, 0)],
        ));

        let mut seat = seat(1);
        seat.add_goal(Goal::ProtectTemple);
        assert_eq!(seat.check_uncompleted_goals(&rooms, &creatures), 0);

        let _ = rooms.remove(id);
        seat.recheck_completed_goals(&rooms, &creatures);

        assert_eq!(seat.failed_goals().len(), 1);
        assert!(seat.completed_goals().is_empty());
    }

    #[test]
    fn winners_are_recorded_once() {
        let mut registry = SeatRegistry::new();
        assert!(registry.add_winner(SeatColor::new(1)));
        assert!(!registry.add_winner(SeatColor::new(1)));
        assert!(registry.is_winner(SeatColor::new(1)));
        assert!(!registry.is_winner(SeatColor::new(2)));
        assert_eq!(registry.winners(), &[SeatColor::new(1)]);
    }
}
