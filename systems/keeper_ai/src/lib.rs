#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic keeper AI that plays a computer-controlled seat.
//!
//! A pure system: it consumes world events and read-only queries and
//! responds exclusively with command batches. The world never calls into it;
//! the driving adapter runs it once per turn and applies what it emits.

use grimhold_core::{Command, Event, GridCoord, Passability, RoomKind, SeatColor, TrapKind};
use grimhold_world::{query, World};
use tracing::debug;

/// How far from the seat's starting position the AI scouts for work.
const SCOUT_RADIUS: i32 = 8;
/// Dig orders the AI keeps outstanding at most per turn.
const DIG_ORDERS_PER_TURN: usize = 4;
/// Footprint the AI aims for when laying out a treasury.
const TREASURY_TILES: usize = 4;
/// Cannons the AI will pay for before hoarding gold.
const CANNON_LIMIT: usize = 2;

/// Pure system that reacts to turn summaries with keeper orders.
#[derive(Debug)]
pub struct KeeperAi {
    color: SeatColor,
}

impl KeeperAi {
    /// Creates an AI playing the seat of the given color.
    #[must_use]
    pub const fn new(color: SeatColor) -> Self {
        Self { color }
    }

    /// Seat color the AI plays.
    #[must_use]
    pub const fn color(&self) -> SeatColor {
        self.color
    }

    /// Consumes world events and read-only state to emit keeper commands.
    /// Orders are only issued when a turn summary is observed, so replaying
    /// bootstrap events never triggers premature planning.
    pub fn handle(&mut self, events: &[Event], world: &World, out: &mut Vec<Command>) {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TurnComputed { .. }))
        {
            return;
        }

        let Some(seat) = query::seat_view(world)
            .into_vec()
            .into_iter()
            .find(|seat| seat.color == self.color)
        else {
            debug!(color = self.color.get(), "keeper ai has no seat to play");
            return;
        };
        let home = seat.starting;

        self.order_digging(world, home, out);
        self.order_treasury(world, home, out);
        self.order_defenses(world, seat.gold, home, out);
    }

    /// Marks the nearest diggable frontier tiles so workers expand the
    /// dungeon toward fresh ground and gold veins.
    fn order_digging(&self, world: &World, home: GridCoord, out: &mut Vec<Command>) {
        let scout_min = GridCoord::new(home.x() - SCOUT_RADIUS, home.y() - SCOUT_RADIUS);
        let scout_max = GridCoord::new(home.x() + SCOUT_RADIUS, home.y() + SCOUT_RADIUS);

        let mut frontier: Vec<GridCoord> =
            query::diggable_tiles_in_area(world, scout_min, scout_max, self.color)
                .into_iter()
                .filter(|&at| has_open_neighbor(world, at))
                .collect();
        frontier.sort_by_key(|&at| home.manhattan_distance(at));

        for at in frontier.into_iter().take(DIG_ORDERS_PER_TURN) {
            out.push(Command::MarkTilesForDigging {
                color: self.color,
                from: at,
                to: at,
                mark: true,
            });
        }
    }

    /// Lays out a treasury once enough claimed ground exists and none is
    /// standing yet; the first one is free by the world's rules.
    fn order_treasury(&self, world: &World, home: GridCoord, out: &mut Vec<Command>) {
        let owns_treasury = query::room_view(world)
            .into_vec()
            .iter()
            .any(|room| room.kind == RoomKind::Treasury && room.color == self.color);
        if owns_treasury {
            return;
        }

        let mut buildable = buildable_near(world, home, self.color);
        if buildable.len() < TREASURY_TILES {
            return;
        }
        buildable.truncate(TREASURY_TILES);

        out.push(Command::PlaceRoom {
            kind: RoomKind::Treasury,
            color: self.color,
            tiles: buildable,
        });
    }

    /// Pays for cannons out of surplus gold, up to the defensive quota.
    fn order_defenses(&self, world: &World, gold: u32, home: GridCoord, out: &mut Vec<Command>) {
        let cannons = query::trap_view(world)
            .into_vec()
            .iter()
            .filter(|trap| trap.kind == TrapKind::Cannon && trap.color == self.color)
            .count();
        if cannons >= CANNON_LIMIT || gold < TrapKind::Cannon.cost_per_tile() {
            return;
        }

        let buildable = buildable_near(world, home, self.color);
        if let Some(&at) = buildable.first() {
            out.push(Command::PlaceTrap {
                kind: TrapKind::Cannon,
                color: self.color,
                tiles: vec![at],
            });
        }
    }
}

/// Buildable tiles around the home position, nearest first.
fn buildable_near(world: &World, home: GridCoord, color: SeatColor) -> Vec<GridCoord> {
    let scout_min = GridCoord::new(home.x() - SCOUT_RADIUS, home.y() - SCOUT_RADIUS);
    let scout_max = GridCoord::new(home.x() + SCOUT_RADIUS, home.y() + SCOUT_RADIUS);
    let mut buildable = query::buildable_tiles_in_area(world, scout_min, scout_max, color);
    buildable.sort_by_key(|&at| home.manhattan_distance(at));
    buildable
}

/// Whether the tile touches open ground a worker could dig it from.
fn has_open_neighbor(world: &World, at: GridCoord) -> bool {
    let candidates = [
        GridCoord::new(at.x(), at.y() - 1),
        GridCoord::new(at.x() - 1, at.y()),
        GridCoord::new(at.x() + 1, at.y()),
        GridCoord::new(at.x(), at.y() + 1),
    ];
    candidates.into_iter().any(|neighbor| {
        query::tile(world, neighbor)
            .is_some_and(|tile| tile.passability == Passability::Walkable)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimhold_core::TileKind;
    use grimhold_world::apply;

    fn run(world: &mut World, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, command, &mut events);
        events
    }

    fn turn_events() -> Vec<Event> {
        vec![Event::TurnComputed {
            turn: 0,
            path_calls: 0,
            creature_turns_micros: 0,
            upkeep_micros: 0,
        }]
    }

    /// 9x9 map with an open claimed pocket around (4,4) for the AI's seat.
    fn keeper_world(color: SeatColor) -> World {
        let mut world = World::new();
        let _ = run(&mut world, Command::CreateMap { width: 9, height: 9 });
        let _ = run(
            &mut world,
            Command::AddSeat {
                color,
                faction: "keeper".to_owned(),
                starting: GridCoord::new(4, 4),
            },
        );
        for y in 3..=5 {
            for x in 3..=5 {
                let _ = run(
                    &mut world,
                    Command::SetTile {
                        at: GridCoord::new(x, y),
                        kind: TileKind::Claimed,
                        fullness: 0.0,
                        owner: Some(color),
                    },
                );
            }
        }
        world
    }

    #[test]
    fn stays_quiet_until_a_turn_summary_arrives() {
        let color = SeatColor::new(2);
        let world = keeper_world(color);
        let mut ai = KeeperAi::new(color);
        let mut out = Vec::new();

        ai.handle(&[], &world, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn marks_the_nearest_diggable_frontier() {
        let color = SeatColor::new(2);
        let world = keeper_world(color);
        let mut ai = KeeperAi::new(color);
        let mut out = Vec::new();

        ai.handle(&turn_events(), &world, &mut out);

        let marks: Vec<&Command> = out
            .iter()
            .filter(|command| matches!(command, Command::MarkTilesForDigging { .. }))
            .collect();
        assert_eq!(marks.len(), DIG_ORDERS_PER_TURN);
        for command in marks {
            let Command::MarkTilesForDigging { color: c, from, to, mark } = command else {
                unreachable!();
            };
            assert_eq!(*c, color);
            assert_eq!(from, to);
            assert!(*mark);
        }
    }

    #[test]
    fn lays_out_a_treasury_on_claimed_ground() {
        let color = SeatColor::new(2);
        let world = keeper_world(color);
        let mut ai = KeeperAi::new(color);
        let mut out = Vec::new();

        ai.handle(&turn_events(), &world, &mut out);

        let treasury = out.iter().find_map(|command| match command {
            Command::PlaceRoom { kind, color: c, tiles } => Some((*kind, *c, tiles.clone())),
            _ => None,
        });
        let (kind, seat, tiles) = treasury.expect("treasury ordered");
        assert_eq!(kind, RoomKind::Treasury);
        assert_eq!(seat, color);
        assert_eq!(tiles.len(), TREASURY_TILES);
    }

    #[test]
    fn does_not_rebuild_an_existing_treasury() {
        let color = SeatColor::new(2);
        let mut world = keeper_world(color);
        let _ = run(
            &mut world,
            Command::PlaceRoom {
                kind: RoomKind::Treasury,
                color,
                tiles: vec![GridCoord::new(3, 3), GridCoord::new(4, 3)],
            },
        );
        let mut ai = KeeperAi::new(color);
        let mut out = Vec::new();

        ai.handle(&turn_events(), &world, &mut out);

        assert!(!out
            .iter()
            .any(|command| matches!(command, Command::PlaceRoom { .. })));
    }

    #[test]
    fn seatless_colors_issue_no_orders() {
        let color = SeatColor::new(2);
        let world = keeper_world(color);
        let mut ai = KeeperAi::new(SeatColor::new(7));
        let mut out = Vec::new();

        ai.handle(&turn_events(), &world, &mut out);

        assert!(out.is_empty());
    }
}
