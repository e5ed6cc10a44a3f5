//! Creature state, the creature registry, and per-turn action dispatch.

use std::collections::{BTreeMap, VecDeque};

use grimhold_core::{
    CreatureAction, CreatureId, CreatureKind, Event, GridCoord, Passability, SeatColor, TileKind,
};
use tracing::debug;

use crate::visibility;
use crate::World;

/// Gold recovered by excavating one gold-bearing tile.
const DUG_GOLD_YIELD: u32 = 250;
/// Experience awarded for excavating a tile.
const DIG_EXPERIENCE: f64 = 1.5;
/// Experience awarded for claiming a tile.
const CLAIM_EXPERIENCE: f64 = 0.5;
/// Experience awarded for landing a melee strike.
const STRIKE_EXPERIENCE: f64 = 2.0;
/// Hit points gained per level.
const LEVEL_UP_HIT_POINTS: f64 = 2.0;

/// A positioned, mobile, stateful actor owned by the creature registry.
#[derive(Clone, Debug)]
pub(crate) struct Creature {
    id: CreatureId,
    kind: CreatureKind,
    color: SeatColor,
    at: GridCoord,
    hit_points: f64,
    mana: f64,
    level: u32,
    experience: f64,
    actions: VecDeque<CreatureAction>,
    visible_tiles: Vec<GridCoord>,
    visible_enemies: Vec<CreatureId>,
}

impl Creature {
    pub(crate) fn new(id: CreatureId, kind: CreatureKind, color: SeatColor, at: GridCoord) -> Self {
        Self {
            id,
            kind,
            color,
            at,
            hit_points: kind.base_hit_points(),
            mana: kind.base_mana(),
            level: 1,
            experience: 0.0,
            actions: VecDeque::new(),
            visible_tiles: Vec::new(),
            visible_enemies: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> CreatureId {
        self.id
    }

    pub(crate) fn kind(&self) -> CreatureKind {
        self.kind
    }

    pub(crate) fn color(&self) -> SeatColor {
        self.color
    }

    pub(crate) fn at(&self) -> GridCoord {
        self.at
    }

    pub(crate) fn set_position(&mut self, at: GridCoord) {
        self.at = at;
    }

    pub(crate) fn hit_points(&self) -> f64 {
        self.hit_points
    }

    pub(crate) fn mana(&self) -> f64 {
        self.mana
    }

    pub(crate) fn level(&self) -> u32 {
        self.level
    }

    pub(crate) fn experience(&self) -> f64 {
        self.experience
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.hit_points > 0.0
    }

    pub(crate) fn take_damage(&mut self, damage: f64) {
        self.hit_points -= damage;
    }

    /// Damage one strike from this creature inflicts; grows with level.
    pub(crate) fn strike_damage(&self) -> f64 {
        self.kind.attack_damage() + 0.5 * f64::from(self.level - 1)
    }

    /// Banks experience and resolves any level-ups it pays for.
    pub(crate) fn receive_experience(&mut self, experience: f64) {
        self.experience += experience;
        while self.experience >= self.experience_to_level() {
            self.experience -= self.experience_to_level();
            self.level += 1;
            self.hit_points += LEVEL_UP_HIT_POINTS;
            debug!(creature = self.id.get(), level = self.level, "creature leveled up");
        }
    }

    fn experience_to_level(&self) -> f64 {
        10.0 * f64::from(self.level)
    }

    pub(crate) fn actions(&self) -> &VecDeque<CreatureAction> {
        &self.actions
    }

    pub(crate) fn push_action(&mut self, action: CreatureAction) {
        self.actions.push_back(action);
    }

    fn push_action_front(&mut self, action: CreatureAction) {
        self.actions.push_front(action);
    }

    pub(crate) fn pop_action(&mut self) {
        let _ = self.actions.pop_front();
    }

    pub(crate) fn clear_actions(&mut self) {
        self.actions.clear();
    }

    pub(crate) fn visible_tiles(&self) -> &[GridCoord] {
        &self.visible_tiles
    }

    pub(crate) fn visible_enemies(&self) -> &[CreatureId] {
        &self.visible_enemies
    }

    fn set_visibility(&mut self, tiles: Vec<GridCoord>, enemies: Vec<CreatureId>) {
        self.visible_tiles = tiles;
        self.visible_enemies = enemies;
    }
}

/// Registry that stores creatures and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct CreatureRegistry {
    entries: BTreeMap<CreatureId, Creature>,
    next_id: u32,
}

impl CreatureRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> CreatureId {
        let id = CreatureId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, creature: Creature) {
        let _ = self.entries.insert(creature.id(), creature);
    }

    pub(crate) fn remove(&mut self, id: CreatureId) -> Option<Creature> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: CreatureId) -> Option<&Creature> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Creature> {
        self.entries.values()
    }

    pub(crate) fn ids(&self) -> Vec<CreatureId> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Executes one turn's worth of behavior for a single creature: refresh the
/// visibility caches, queue new work when idle, then advance at most one
/// action. The turn engine is oblivious to what happens in here beyond
/// "returns after one turn's worth of action".
pub(crate) fn take_turn(world: &mut World, id: CreatureId, events: &mut Vec<Event>) {
    let Some(creature) = world.creatures.get(id) else {
        return;
    };
    if !creature.is_alive() {
        return;
    }
    let at = creature.at();
    let color = creature.color();
    let kind = creature.kind();

    let visible = visibility::visible_tiles(&world.grid, &world.radial, at, kind.sight_radius());
    let mut enemies = Vec::new();
    for &tile_at in &visible {
        let Some(tile) = world.grid.tile(tile_at) else {
            continue;
        };
        for &occupant in tile.occupants() {
            let hostile = world
                .creatures
                .get(occupant)
                .is_some_and(|other| other.color() != color && other.is_alive());
            if hostile {
                enemies.push(occupant);
            }
        }
    }
    if let Some(creature) = world.creatures.get_mut(id) {
        creature.set_visibility(visible, enemies);
    }

    let needs_decision = world
        .creatures
        .get(id)
        .is_some_and(|creature| creature.actions().is_empty());
    if needs_decision {
        decide_next_action(world, id);
    }

    advance_action(world, id, events);
}

/// Picks the next piece of work for an idle creature and queues it.
fn decide_next_action(world: &mut World, id: CreatureId) {
    let Some(creature) = world.creatures.get(id) else {
        return;
    };
    let at = creature.at();
    let color = creature.color();

    if !creature.kind().is_worker() {
        let target = creature
            .visible_enemies()
            .iter()
            .copied()
            .min_by_key(|&enemy| {
                world
                    .creatures
                    .get(enemy)
                    .map_or(u32::MAX, |other| at.manhattan_distance(other.at()))
            });
        if let Some(creature) = world.creatures.get_mut(id) {
            match target {
                Some(target) => creature.push_action(CreatureAction::Attack { target }),
                None => creature.push_action(CreatureAction::Idle),
            }
        }
        return;
    }

    // Workers prefer dig orders, then claiming the ground beneath them, then
    // walking to fresh claimable ground.
    if let Some(target) = adjacent_marked_tile(world, at, color) {
        if let Some(creature) = world.creatures.get_mut(id) {
            creature.push_action(CreatureAction::Dig { target });
        }
        return;
    }

    if let Some((target, path)) = reachable_marked_tile(world, id, at, color) {
        if let Some(creature) = world.creatures.get_mut(id) {
            if !path.is_empty() {
                creature.push_action(CreatureAction::Walk { path });
            }
            creature.push_action(CreatureAction::Dig { target });
        }
        return;
    }

    if tile_is_claimable(world, at, color) {
        if let Some(creature) = world.creatures.get_mut(id) {
            creature.push_action(CreatureAction::Claim { target: at });
        }
        return;
    }

    if let Some((target, path)) = reachable_claimable_tile(world, id, at, color) {
        if let Some(creature) = world.creatures.get_mut(id) {
            creature.push_action(CreatureAction::Walk { path });
            creature.push_action(CreatureAction::Claim { target });
        }
        return;
    }

    if let Some(creature) = world.creatures.get_mut(id) {
        creature.push_action(CreatureAction::Idle);
    }
}

/// Advances the action at the front of the creature's queue by one turn.
fn advance_action(world: &mut World, id: CreatureId, events: &mut Vec<Event>) {
    let Some(action) = world
        .creatures
        .get(id)
        .and_then(|creature| creature.actions().front().cloned())
    else {
        return;
    };

    match action {
        CreatureAction::Idle => {
            if let Some(creature) = world.creatures.get_mut(id) {
                creature.pop_action();
            }
        }
        CreatureAction::Walk { mut path } => {
            let at = match world.creatures.get(id) {
                Some(creature) => creature.at(),
                None => return,
            };
            while path.front() == Some(&at) {
                let _ = path.pop_front();
            }

            let Some(next) = path.pop_front() else {
                if let Some(creature) = world.creatures.get_mut(id) {
                    creature.pop_action();
                }
                return;
            };

            let walkable = world
                .grid
                .tile(next)
                .is_some_and(|tile| tile.passability() == Passability::Walkable);
            if !next.is_cardinal_neighbor(at) || !walkable {
                // The map changed under the path; drop the whole plan.
                if let Some(creature) = world.creatures.get_mut(id) {
                    creature.clear_actions();
                }
                return;
            }

            move_creature(world, id, next);
            if let Some(creature) = world.creatures.get_mut(id) {
                creature.pop_action();
                if !path.is_empty() {
                    creature.push_action_front(CreatureAction::Walk { path });
                }
            }
        }
        CreatureAction::Dig { target } => {
            let at = match world.creatures.get(id) {
                Some(creature) => creature.at(),
                None => return,
            };
            let color = match world.creatures.get(id) {
                Some(creature) => creature.color(),
                None => return,
            };

            let diggable = world
                .grid
                .tile(target)
                .is_some_and(|tile| tile.is_diggable(color));
            let in_reach = at.is_cardinal_neighbor(target);

            if diggable && in_reach {
                let removed = match world.grid.tile_mut(target) {
                    Some(tile) => tile.dig(),
                    None => return,
                };
                events.push(Event::TileDug { at: target, by: id });
                events.push(Event::TileChanged { at: target });

                if removed == TileKind::Gold {
                    let deposited = world.rooms.deposit_gold_for(color, DUG_GOLD_YIELD);
                    debug!(
                        creature = id.get(),
                        deposited, "gold tile excavated and banked"
                    );
                }
                if let Some(creature) = world.creatures.get_mut(id) {
                    creature.receive_experience(DIG_EXPERIENCE);
                }
                world.refresh_connectivity();
            }

            if let Some(creature) = world.creatures.get_mut(id) {
                creature.pop_action();
            }
        }
        CreatureAction::Claim { target } => {
            let (at, color) = match world.creatures.get(id) {
                Some(creature) => (creature.at(), creature.color()),
                None => return,
            };

            if at == target && tile_is_claimable(world, target, color) {
                if let Some(tile) = world.grid.tile_mut(target) {
                    tile.claim(color);
                }

                // Claiming ground out from under an enemy room steals the
                // tile from its footprint; the room dies in upkeep once the
                // last one is gone.
                let stolen_from = world.grid.tile(target).and_then(|tile| {
                    tile.covering_room().filter(|&room_id| {
                        world
                            .rooms
                            .get(room_id)
                            .is_some_and(|room| room.color() != color)
                    })
                });
                if let Some(room_id) = stolen_from {
                    if let Some(room) = world.rooms.get_mut(room_id) {
                        let _ = room.remove_covered_tile(target);
                    }
                    if let Some(tile) = world.grid.tile_mut(target) {
                        tile.set_covering_room(None);
                    }
                }

                events.push(Event::TileClaimed { at: target, color });
                events.push(Event::TileChanged { at: target });
                if let Some(creature) = world.creatures.get_mut(id) {
                    creature.receive_experience(CLAIM_EXPERIENCE);
                }
                world.refresh_connectivity();
            }

            if let Some(creature) = world.creatures.get_mut(id) {
                creature.pop_action();
            }
        }
        CreatureAction::Attack { target } => {
            let (at, color) = match world.creatures.get(id) {
                Some(creature) => (creature.at(), creature.color()),
                None => return,
            };

            let target_state = world
                .creatures
                .get(target)
                .filter(|other| other.is_alive())
                .map(|other| other.at());
            let Some(target_at) = target_state else {
                if let Some(creature) = world.creatures.get_mut(id) {
                    creature.pop_action();
                }
                return;
            };

            if at == target_at || at.is_cardinal_neighbor(target_at) {
                let damage = world
                    .creatures
                    .get(id)
                    .map_or(0.0, Creature::strike_damage);
                let remaining = match world.creatures.get_mut(target) {
                    Some(victim) => {
                        victim.take_damage(damage);
                        victim.hit_points()
                    }
                    None => return,
                };
                events.push(Event::CreatureDamaged {
                    creature: target,
                    damage,
                    remaining,
                });
                if let Some(creature) = world.creatures.get_mut(id) {
                    creature.receive_experience(STRIKE_EXPERIENCE);
                }
                return;
            }

            // Close the distance by one tile per turn.
            let route = world.path_internal(at, target_at, Passability::Walkable, color);
            if route.len() >= 2 {
                move_creature(world, id, route[1]);
            } else if let Some(creature) = world.creatures.get_mut(id) {
                creature.pop_action();
            }
        }
    }
}

/// Moves a creature one tile, keeping the occupant lists of both tiles and
/// the creature's position consistent in one step.
fn move_creature(world: &mut World, id: CreatureId, to: GridCoord) {
    let Some(from) = world.creatures.get(id).map(Creature::at) else {
        return;
    };
    if let Some(tile) = world.grid.tile_mut(from) {
        tile.remove_occupant(id);
    }
    if let Some(tile) = world.grid.tile_mut(to) {
        tile.add_occupant(id);
    }
    if let Some(creature) = world.creatures.get_mut(id) {
        creature.set_position(to);
    }
}

fn adjacent_marked_tile(world: &World, at: GridCoord, color: SeatColor) -> Option<GridCoord> {
    world.grid.cardinal_neighbors(at).find(|&neighbor| {
        world
            .grid
            .tile(neighbor)
            .is_some_and(|tile| tile.is_marked_by(color) && tile.is_diggable(color))
    })
}

/// Nearest visible dig order the worker can actually walk to, paired with
/// the walking path to a tile beside it.
fn reachable_marked_tile(
    world: &mut World,
    id: CreatureId,
    at: GridCoord,
    color: SeatColor,
) -> Option<(GridCoord, VecDeque<GridCoord>)> {
    let mut marked: Vec<GridCoord> = world
        .creatures
        .get(id)?
        .visible_tiles()
        .iter()
        .copied()
        .filter(|&tile_at| {
            world
                .grid
                .tile(tile_at)
                .is_some_and(|tile| tile.is_marked_by(color) && tile.is_diggable(color))
        })
        .collect();
    marked.sort_by_key(|&tile_at| at.manhattan_distance(tile_at));

    for target in marked {
        for side in world.grid.cardinal_neighbors(target).collect::<Vec<_>>() {
            let walkable = world
                .grid
                .tile(side)
                .is_some_and(|tile| tile.passability() == Passability::Walkable);
            if !walkable {
                continue;
            }
            if side == at {
                return Some((target, VecDeque::new()));
            }
            let route = world.path_internal(at, side, Passability::Walkable, color);
            if route.len() >= 2 {
                return Some((target, route.into_iter().skip(1).collect()));
            }
        }
    }
    None
}

fn tile_is_claimable(world: &World, at: GridCoord, color: SeatColor) -> bool {
    world.grid.tile(at).is_some_and(|tile| {
        tile.passability() == Passability::Walkable
            && match tile.kind() {
                TileKind::Dirt => true,
                TileKind::Claimed => tile.owner() != Some(color),
                _ => false,
            }
    })
}

/// Nearest visible claimable tile the worker can walk onto, paired with the
/// path leading there.
fn reachable_claimable_tile(
    world: &mut World,
    id: CreatureId,
    at: GridCoord,
    color: SeatColor,
) -> Option<(GridCoord, VecDeque<GridCoord>)> {
    let mut claimable: Vec<GridCoord> = world
        .creatures
        .get(id)?
        .visible_tiles()
        .iter()
        .copied()
        .filter(|&tile_at| tile_at != at && tile_is_claimable(world, tile_at, color))
        .collect();
    claimable.sort_by_key(|&tile_at| at.manhattan_distance(tile_at));

    for target in claimable {
        let route = world.path_internal(at, target, Passability::Walkable, color);
        if route.len() >= 2 {
            return Some((target, route.into_iter().skip(1).collect()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> Creature {
        Creature::new(
            CreatureId::new(7),
            CreatureKind::Worker,
            SeatColor::new(1),
            GridCoord::new(0, 0),
        )
    }

    #[test]
    fn fresh_creatures_inherit_their_kind_stats() {
        let creature = worker();
        assert_eq!(creature.hit_points(), CreatureKind::Worker.base_hit_points());
        assert_eq!(creature.mana(), CreatureKind::Worker.base_mana());
        assert_eq!(creature.level(), 1);
        assert!(creature.is_alive());
    }

    #[test]
    fn damage_can_kill() {
        let mut creature = worker();
        creature.take_damage(CreatureKind::Worker.base_hit_points() + 1.0);
        assert!(!creature.is_alive());
    }

    #[test]
    fn experience_pays_for_level_ups() {
        let mut creature = worker();
        let before = creature.hit_points();

        creature.receive_experience(9.0);
        assert_eq!(creature.level(), 1);

        creature.receive_experience(1.0);
        assert_eq!(creature.level(), 2);
        assert!(creature.hit_points() > before);
        assert!(creature.experience() < 1e-9);
    }

    #[test]
    fn strike_damage_grows_with_level() {
        let mut creature = worker();
        let base = creature.strike_damage();
        creature.receive_experience(10.0);
        assert!(creature.strike_damage() > base);
    }

    #[test]
    fn registry_allocates_monotone_identifiers() {
        let mut registry = CreatureRegistry::new();
        let first = registry.allocate_id();
        let second = registry.allocate_id();
        assert!(second.get() > first.get());

        registry.insert(Creature::new(
            first,
            CreatureKind::Fighter,
            SeatColor::new(2),
            GridCoord::new(1, 1),
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(first).is_some());
        assert!(registry.get(second).is_none());

        let removed = registry.remove(first).expect("creature exists");
        assert_eq!(removed.id(), first);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn action_queue_preserves_order() {
        let mut creature = worker();
        creature.push_action(CreatureAction::Idle);
        creature.push_action(CreatureAction::Dig {
            target: GridCoord::new(1, 0),
        });

        assert_eq!(creature.actions().len(), 2);
        creature.pop_action();
        assert_eq!(
            creature.actions().front(),
            Some(&CreatureAction::Dig {
                target: GridCoord::new(1, 0)
            })
        );
        creature.clear_actions();
        assert!(creature.actions().is_empty());
    }
}
