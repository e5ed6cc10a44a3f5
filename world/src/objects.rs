//! Map lights and missiles: the small polled-and-pooled object registries.

use std::collections::{BTreeMap, VecDeque};

use grimhold_core::{GridCoord, LightColor, MapLightId, MissileId, SeatColor};

/// A light source the renderer polls once per frame.
#[derive(Clone, Debug)]
pub(crate) struct MapLight {
    id: MapLightId,
    at: GridCoord,
    color: LightColor,
    intensity: f64,
}

impl MapLight {
    pub(crate) fn new(id: MapLightId, at: GridCoord, color: LightColor, intensity: f64) -> Self {
        Self {
            id,
            at,
            color,
            intensity,
        }
    }

    pub(crate) fn id(&self) -> MapLightId {
        self.id
    }

    pub(crate) fn at(&self) -> GridCoord {
        self.at
    }

    pub(crate) fn color(&self) -> LightColor {
        self.color
    }

    pub(crate) fn intensity(&self) -> f64 {
        self.intensity
    }
}

/// Registry that stores map lights and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct MapLightRegistry {
    entries: BTreeMap<MapLightId, MapLight>,
    next_id: u32,
}

impl MapLightRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> MapLightId {
        let id = MapLightId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, light: MapLight) {
        let _ = self.entries.insert(light.id(), light);
    }

    pub(crate) fn remove(&mut self, id: MapLightId) -> Option<MapLight> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &MapLight> {
        self.entries.values()
    }
}

/// A projectile in flight along a precomputed corridor; an active object
/// that expires on impact or at the end of its path.
#[derive(Clone, Debug)]
pub(crate) struct Missile {
    id: MissileId,
    color: SeatColor,
    damage: f64,
    at: GridCoord,
    flight: VecDeque<GridCoord>,
}

impl Missile {
    pub(crate) fn new(
        id: MissileId,
        color: SeatColor,
        damage: f64,
        at: GridCoord,
        flight: VecDeque<GridCoord>,
    ) -> Self {
        Self {
            id,
            color,
            damage,
            at,
            flight,
        }
    }

    pub(crate) fn id(&self) -> MissileId {
        self.id
    }

    pub(crate) fn color(&self) -> SeatColor {
        self.color
    }

    pub(crate) fn damage(&self) -> f64 {
        self.damage
    }

    pub(crate) fn at(&self) -> GridCoord {
        self.at
    }

    /// Advances one tile along the flight path, returning the new position
    /// or nothing when the path is spent.
    pub(crate) fn advance(&mut self) -> Option<GridCoord> {
        let next = self.flight.pop_front()?;
        self.at = next;
        Some(next)
    }
}

/// Registry that stores missiles and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct MissileRegistry {
    entries: BTreeMap<MissileId, Missile>,
    next_id: u32,
}

impl MissileRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> MissileId {
        let id = MissileId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, missile: Missile) {
        let _ = self.entries.insert(missile.id(), missile);
    }

    pub(crate) fn remove(&mut self, id: MissileId) -> Option<Missile> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: MissileId) -> Option<&Missile> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: MissileId) -> Option<&mut Missile> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Missile> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missiles_fly_their_corridor_and_expire() {
        let flight: VecDeque<GridCoord> =
            [GridCoord::new(1, 0), GridCoord::new(2, 0)].into_iter().collect();
        let mut missile = Missile::new(
            MissileId::new(0),
            SeatColor::new(1),
            6.0,
            GridCoord::new(0, 0),
            flight,
        );

        assert_eq!(missile.advance(), Some(GridCoord::new(1, 0)));
        assert_eq!(missile.at(), GridCoord::new(1, 0));
        assert_eq!(missile.advance(), Some(GridCoord::new(2, 0)));
        assert_eq!(missile.advance(), None);
    }

    #[test]
    fn light_registry_allocates_monotone_identifiers() {
        let mut registry = MapLightRegistry::new();
        let first = registry.allocate_id();
        let second = registry.allocate_id();
        assert!(second.get() > first.get());

        registry.insert(MapLight::new(
            first,
            GridCoord::new(2, 2),
            LightColor::from_rgb(255, 220, 180),
            0.8,
        ));
        assert_eq!(registry.iter().count(), 1);
        assert!(registry.remove(first).is_some());
        assert!(registry.remove(second).is_none());
    }
}
