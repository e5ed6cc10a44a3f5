#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Grimhold engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command
//! batches.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Location of a single map tile expressed as signed grid coordinates.
///
/// Coordinates are signed so that radial visibility offsets compose with map
/// positions without underflow; lookups outside the grid simply resolve to
/// nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    x: i32,
    y: i32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal component of the coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical component of the coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Computes the Manhattan distance between two coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: GridCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the straight-line ("as the crow flies") distance between two
    /// coordinates.
    #[must_use]
    pub fn crow_distance(self, other: GridCoord) -> f64 {
        let dx = f64::from(other.x - self.x);
        let dy = f64::from(other.y - self.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Reports whether the two coordinates are 4-adjacent (share an edge).
    #[must_use]
    pub fn is_cardinal_neighbor(self, other: GridCoord) -> bool {
        self.manhattan_distance(other) == 1
    }
}

/// Identifier of the seat (player faction slot) that owns an entity.
///
/// A color uniquely identifies a seat within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatColor(u32);

impl SeatColor {
    /// Creates a new seat color with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the color.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatureId(u32);

impl CreatureId {
    /// Creates a new creature identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(u32);

impl RoomId {
    /// Creates a new room identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a trap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrapId(u32);

impl TrapId {
    /// Creates a new trap identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a missile in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissileId(u32);

impl MissileId {
    /// Creates a new missile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a map light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapLightId(u32);

impl MapLightId {
    /// Creates a new map light identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Connectivity-component tag assigned to tiles by the flood-fill cache.
///
/// Two walkable tiles carry the same tag exactly when a walking creature can
/// reach one from the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectivityTag(u32);

impl ConnectivityTag {
    /// Creates a new connectivity tag with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tag.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Terrain classification of a single map tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Ordinary earth; diggable by any seat while solid.
    Dirt,
    /// Gold-bearing earth; digging it yields gold for the digger's seat.
    Gold,
    /// Bedrock; can never be dug.
    Rock,
    /// Open water; only flying creatures may cross.
    Water,
    /// Molten rock; only flying creatures may cross.
    Lava,
    /// Ground claimed by a seat; solid claimed tiles are fortified walls that
    /// only their owner may dig.
    Claimed,
}

/// Traversal policy gating which creature movement types may enter a tile.
///
/// `Walkable`, `Flyable` and `Impassable` describe tiles; `Diggable` is a
/// request class used by pathfinding to let workers route through earth they
/// are allowed to excavate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Passability {
    /// Open ground traversable by every mobile creature.
    Walkable,
    /// Terrain traversable only by flying creatures.
    Flyable,
    /// Search class admitting open ground plus earth diggable by the
    /// requesting seat.
    Diggable,
    /// Terrain no creature may enter.
    Impassable,
}

/// Classes of creatures that inhabit the dungeon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureKind {
    /// Digs, claims ground and hauls gold; spawned by dungeon temples.
    Worker,
    /// Fights enemy creatures on sight.
    Fighter,
}

impl CreatureKind {
    /// Reports whether creatures of this kind perform worker duties.
    #[must_use]
    pub const fn is_worker(self) -> bool {
        matches!(self, Self::Worker)
    }

    /// Hit points a freshly spawned creature of this kind starts with.
    #[must_use]
    pub const fn base_hit_points(self) -> f64 {
        match self {
            Self::Worker => 10.0,
            Self::Fighter => 30.0,
        }
    }

    /// Mana pool a freshly spawned creature of this kind starts with.
    #[must_use]
    pub const fn base_mana(self) -> f64 {
        match self {
            Self::Worker => 0.0,
            Self::Fighter => 20.0,
        }
    }

    /// Damage dealt by one melee strike at level one.
    #[must_use]
    pub const fn attack_damage(self) -> f64 {
        match self {
            Self::Worker => 1.0,
            Self::Fighter => 4.0,
        }
    }

    /// Radius in tiles within which the creature resolves visibility.
    #[must_use]
    pub const fn sight_radius(self) -> u32 {
        match self {
            Self::Worker => 10,
            Self::Fighter => 15,
        }
    }
}

/// Types of rooms that can be laid out over claimed ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    /// Heart of a dungeon; produces workers during upkeep.
    DungeonTemple,
    /// Stores the seat's gold; capacity grows with covered area.
    Treasury,
}

impl RoomKind {
    /// Gold one covered tile of this room kind can store.
    #[must_use]
    pub const fn gold_capacity_per_tile(self) -> u32 {
        match self {
            Self::DungeonTemple => 0,
            Self::Treasury => 1_000,
        }
    }

    /// Gold one covered tile of this room kind costs to build. Temples are
    /// never built mid-game; they arrive with the level.
    #[must_use]
    pub const fn cost_per_tile(self) -> u32 {
        match self {
            Self::DungeonTemple => 0,
            Self::Treasury => 50,
        }
    }
}

/// Types of traps that can be buried in claimed ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapKind {
    /// Fires a missile at the nearest visible enemy in range.
    Cannon,
    /// Wounds enemies standing on its covered tiles.
    Spikes,
}

impl TrapKind {
    /// Targeting range measured in tiles; zero for contact traps.
    #[must_use]
    pub const fn range_in_tiles(self) -> f64 {
        match self {
            Self::Cannon => 8.0,
            Self::Spikes => 0.0,
        }
    }

    /// Damage inflicted by one triggering of the trap.
    #[must_use]
    pub const fn damage(self) -> f64 {
        match self {
            Self::Cannon => 6.0,
            Self::Spikes => 3.0,
        }
    }

    /// Turns the trap must rest between triggerings.
    #[must_use]
    pub const fn cooldown_turns(self) -> u32 {
        match self {
            Self::Cannon => 2,
            Self::Spikes => 0,
        }
    }

    /// Gold one covered tile of this trap kind costs to build.
    #[must_use]
    pub const fn cost_per_tile(self) -> u32 {
        match self {
            Self::Cannon => 250,
            Self::Spikes => 150,
        }
    }
}

/// Victory condition attached to every seat in a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Goal {
    /// Claim at least the given number of tiles.
    ClaimTiles {
        /// Number of claimed tiles required.
        count: u32,
    },
    /// Accumulate at least the given amount of treasury gold.
    AcquireGold {
        /// Amount of gold required.
        amount: u32,
    },
    /// Eliminate every creature belonging to another seat.
    KillAllEnemies,
    /// Keep at least one dungeon temple standing; losing the last one fails
    /// the goal permanently.
    ProtectTemple,
}

/// Outcome of evaluating a [`Goal`] against the current world state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GoalStatus {
    /// The goal's condition currently holds.
    Met,
    /// The goal's condition does not hold yet.
    Unmet,
    /// The goal can no longer be met.
    Failed,
}

/// Color emitted by a map light, expressed as byte RGB components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl LightColor {
    /// Creates a new light color from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Red component of the color.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the color.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the color.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// One step of behavior queued on a creature.
///
/// A creature advances at most one action per turn; the queue front is the
/// action currently being performed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreatureAction {
    /// Do nothing this turn.
    Idle,
    /// Follow the queued tile path one step per turn.
    Walk {
        /// Remaining tiles to visit, nearest first.
        path: VecDeque<GridCoord>,
    },
    /// Excavate the target tile once adjacent to it.
    Dig {
        /// Solid tile to excavate.
        target: GridCoord,
    },
    /// Convert the target tile to the creature's seat once on or beside it.
    Claim {
        /// Open tile to claim.
        target: GridCoord,
    },
    /// Close with and strike the target creature.
    Attack {
        /// Creature to fight.
        target: CreatureId,
    },
}

/// Reference to a simulated entity queued for deferred destruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityRef {
    /// A creature, identified by its id.
    Creature(CreatureId),
    /// A room, identified by its id.
    Room(RoomId),
    /// A trap, identified by its id.
    Trap(TrapId),
    /// A missile, identified by its id.
    Missile(MissileId),
}

/// A creature or room selected by a visible-force query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisibleUnit {
    /// A creature standing on a visible tile.
    Creature(CreatureId),
    /// A room covering at least one visible tile.
    Room(RoomId),
}

/// Reasons a room or trap placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The footprint contained no tiles.
    EmptyFootprint,
    /// A footprint tile lies outside the grid.
    OutOfBounds,
    /// A footprint tile is not claimed ground.
    NotClaimed,
    /// A footprint tile is claimed by a different seat.
    WrongOwner,
    /// A footprint tile is not open (still solid).
    NotOpen,
    /// A footprint tile is already covered by another room or trap.
    AlreadyCovered,
    /// The seat's treasuries cannot pay for the footprint.
    NotEnoughGold,
}

/// Reasons a creature spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnError {
    /// The spawn tile lies outside the grid.
    OutOfBounds,
    /// The spawn tile cannot be stood upon.
    NotWalkable,
    /// No seat with the requested color exists.
    UnknownSeat,
}

/// Reasons a seat or player registration may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatError {
    /// A seat with the same color already exists.
    DuplicateColor,
    /// No unbound seat with the requested color exists.
    NoEmptySeat,
    /// A player with the same nickname already exists.
    DuplicateNick,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resets the world to a fresh solid-earth map of the given dimensions.
    CreateMap {
        /// Number of tile columns.
        width: u32,
        /// Number of tile rows.
        height: u32,
    },
    /// Overwrites one tile; the map-loader boundary primitive.
    SetTile {
        /// Tile to overwrite.
        at: GridCoord,
        /// Terrain classification to apply.
        kind: TileKind,
        /// Fullness to apply, `0.0` open through `1.0` solid.
        fullness: f64,
        /// Owning seat, for claimed tiles.
        owner: Option<SeatColor>,
    },
    /// Builds the flood-fill connectivity cache and keeps it current from
    /// this point on.
    EnableFloodFill,
    /// Registers an unbound seat.
    AddSeat {
        /// Color uniquely identifying the seat.
        color: SeatColor,
        /// Faction label carried by the seat.
        faction: String,
        /// Starting position used to aim the seat's first camera and spawns.
        starting: GridCoord,
    },
    /// Registers a player and binds them to the empty seat of the given
    /// color.
    AddPlayer {
        /// Player nickname; unique within a world.
        nick: String,
        /// Color of the empty seat to bind.
        color: SeatColor,
        /// Whether the player is computer-controlled.
        is_ai: bool,
    },
    /// Removes a player and returns their seat to the empty set.
    RemovePlayer {
        /// Nickname of the player to remove.
        nick: String,
    },
    /// Attaches a victory goal to every current and future seat.
    AddGoal {
        /// Goal to attach.
        goal: Goal,
    },
    /// Spawns a creature for a seat at the given tile.
    SpawnCreature {
        /// Class of creature to spawn.
        kind: CreatureKind,
        /// Seat that will control the creature.
        color: SeatColor,
        /// Tile the creature appears on.
        at: GridCoord,
    },
    /// Removes a creature from the map, queueing it for deferred destruction.
    RemoveCreature {
        /// Identifier of the creature to remove.
        creature: CreatureId,
    },
    /// Lays a room out over the given claimed tiles.
    PlaceRoom {
        /// Kind of room to build.
        kind: RoomKind,
        /// Seat paying for and owning the room.
        color: SeatColor,
        /// Tiles forming the room's footprint.
        tiles: Vec<GridCoord>,
    },
    /// Removes an existing room, queueing it for deferred destruction.
    RemoveRoom {
        /// Identifier of the room to remove.
        room: RoomId,
    },
    /// Buries a trap under the given claimed tiles.
    PlaceTrap {
        /// Kind of trap to build.
        kind: TrapKind,
        /// Seat owning the trap.
        color: SeatColor,
        /// Tiles forming the trap's footprint.
        tiles: Vec<GridCoord>,
    },
    /// Removes an existing trap, queueing it for deferred destruction.
    RemoveTrap {
        /// Identifier of the trap to remove.
        trap: TrapId,
    },
    /// Adds a light source for the renderer to poll.
    AddMapLight {
        /// Tile the light sits on.
        at: GridCoord,
        /// Color the light emits.
        color: LightColor,
        /// Brightness of the light.
        intensity: f64,
    },
    /// Removes a map light, queueing it for deferred destruction.
    RemoveMapLight {
        /// Identifier of the light to remove.
        light: MapLightId,
    },
    /// Marks or unmarks every tile in a rectangle that the seat may dig.
    MarkTilesForDigging {
        /// Seat issuing the dig order.
        color: SeatColor,
        /// One corner of the rectangle.
        from: GridCoord,
        /// The opposite corner of the rectangle.
        to: GridCoord,
        /// `true` to mark, `false` to rescind the order.
        mark: bool,
    },
    /// Advances the simulation by exactly one discrete turn.
    DoTurn,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a fresh map replaced the previous world state.
    MapCreated {
        /// Number of tile columns.
        width: u32,
        /// Number of tile rows.
        height: u32,
    },
    /// Reports that a tile's terrain, fullness or owner changed.
    TileChanged {
        /// Coordinate of the mutated tile.
        at: GridCoord,
    },
    /// Confirms that the connectivity cache was rebuilt from scratch.
    FloodFillRebuilt {
        /// Number of connected walkable components found.
        components: u32,
    },
    /// Confirms that an unbound seat joined the world.
    SeatAdded {
        /// Color of the new seat.
        color: SeatColor,
    },
    /// Reports that a seat registration was rejected.
    SeatRejected {
        /// Color carried by the rejected request.
        color: SeatColor,
        /// Specific reason the registration failed.
        reason: SeatError,
    },
    /// Confirms that a player joined and their seat moved to the filled set.
    PlayerAdded {
        /// Nickname of the new player.
        nick: String,
        /// Color of the seat they now hold.
        color: SeatColor,
    },
    /// Reports that a player registration was rejected.
    PlayerRejected {
        /// Nickname carried by the rejected request.
        nick: String,
        /// Specific reason the registration failed.
        reason: SeatError,
    },
    /// Confirms that a player left and their seat returned to the empty set.
    PlayerRemoved {
        /// Nickname of the departed player.
        nick: String,
        /// Color of the seat they released.
        color: SeatColor,
    },
    /// Confirms that a goal now binds every seat.
    GoalAdded {
        /// Goal that was attached.
        goal: Goal,
    },
    /// Confirms that a creature entered the world.
    CreatureSpawned {
        /// Identifier allocated to the creature.
        creature: CreatureId,
        /// Class of the creature.
        kind: CreatureKind,
        /// Seat controlling the creature.
        color: SeatColor,
        /// Tile the creature appeared on.
        at: GridCoord,
    },
    /// Reports that a creature spawn request was rejected.
    CreatureRejected {
        /// Class carried by the rejected request.
        kind: CreatureKind,
        /// Seat carried by the rejected request.
        color: SeatColor,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that a creature was struck and reports its remaining health.
    CreatureDamaged {
        /// Creature that was struck.
        creature: CreatureId,
        /// Damage inflicted by the strike.
        damage: f64,
        /// Hit points remaining after the strike.
        remaining: f64,
    },
    /// Confirms that a room was placed into the world.
    RoomPlaced {
        /// Identifier allocated to the room.
        room: RoomId,
        /// Kind of room that was built.
        kind: RoomKind,
        /// Seat owning the room.
        color: SeatColor,
        /// Number of tiles the room covers.
        tiles: u32,
    },
    /// Reports that a room placement request was rejected.
    RoomRejected {
        /// Kind carried by the rejected request.
        kind: RoomKind,
        /// Seat carried by the rejected request.
        color: SeatColor,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a trap was placed into the world.
    TrapPlaced {
        /// Identifier allocated to the trap.
        trap: TrapId,
        /// Kind of trap that was buried.
        kind: TrapKind,
        /// Seat owning the trap.
        color: SeatColor,
        /// Number of tiles the trap covers.
        tiles: u32,
    },
    /// Reports that a trap placement request was rejected.
    TrapRejected {
        /// Kind carried by the rejected request.
        kind: TrapKind,
        /// Seat carried by the rejected request.
        color: SeatColor,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a map light joined the world.
    MapLightAdded {
        /// Identifier allocated to the light.
        light: MapLightId,
    },
    /// Announces that a map light awaits destruction; the renderer's
    /// mesh-teardown hook observes this before the light is freed.
    MapLightQueuedForDeletion {
        /// Identifier of the queued light.
        light: MapLightId,
    },
    /// Announces that an entity awaits destruction; renderers and network
    /// mirrors observe this before the entity is freed between turns.
    EntityQueuedForDeletion {
        /// Reference to the queued entity.
        entity: EntityRef,
    },
    /// Confirms that a cannon launched a missile.
    MissileLaunched {
        /// Identifier allocated to the missile.
        missile: MissileId,
        /// Seat the missile fights for.
        color: SeatColor,
        /// Tile the missile launched from.
        from: GridCoord,
    },
    /// Confirms that a missile struck something or ran out of flight path.
    MissileExpired {
        /// Identifier of the expired missile.
        missile: MissileId,
    },
    /// Confirms how many tiles a dig order touched.
    TilesMarkedForDigging {
        /// Seat that issued the order.
        color: SeatColor,
        /// Number of tiles whose marking changed.
        count: u32,
    },
    /// Confirms that a worker excavated a tile to open ground.
    TileDug {
        /// Coordinate of the excavated tile.
        at: GridCoord,
        /// Creature that performed the dig.
        by: CreatureId,
    },
    /// Confirms that ground was converted to a seat's claimed territory.
    TileClaimed {
        /// Coordinate of the claimed tile.
        at: GridCoord,
        /// Seat that now owns the tile.
        color: SeatColor,
    },
    /// Confirms that a dungeon temple produced a worker during upkeep.
    WorkerSpawned {
        /// Identifier allocated to the worker.
        creature: CreatureId,
        /// Seat controlling the worker.
        color: SeatColor,
        /// Tile the worker appeared on.
        at: GridCoord,
    },
    /// Announces that a seat satisfied every goal and joined the winners.
    SeatWon {
        /// Color of the winning seat.
        color: SeatColor,
    },
    /// Summarizes one completed simulation turn.
    TurnComputed {
        /// Turn number that just finished.
        turn: i64,
        /// Pathfinding invocations made while computing the turn.
        path_calls: u64,
        /// Microseconds spent advancing creatures.
        creature_turns_micros: u64,
        /// Microseconds spent in miscellaneous upkeep.
        upkeep_micros: u64,
    },
}

/// Immutable representation of a single tile used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TileSnapshot {
    /// Coordinate of the tile.
    pub at: GridCoord,
    /// Terrain classification of the tile.
    pub kind: TileKind,
    /// Fullness of the tile, `0.0` open through `1.0` solid.
    pub fullness: f64,
    /// Seat owning the tile, if claimed.
    pub owner: Option<SeatColor>,
    /// Traversal policy derived from kind and fullness.
    pub passability: Passability,
    /// Connectivity tag assigned by the flood-fill cache, if built.
    pub connectivity: Option<ConnectivityTag>,
    /// Creatures currently standing on the tile.
    pub occupants: Vec<CreatureId>,
    /// Room covering the tile, if any.
    pub covering_room: Option<RoomId>,
    /// Trap covering the tile, if any.
    pub covering_trap: Option<TrapId>,
}

/// Immutable representation of a single creature's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct CreatureSnapshot {
    /// Unique identifier assigned to the creature.
    pub id: CreatureId,
    /// Class of the creature.
    pub kind: CreatureKind,
    /// Seat controlling the creature.
    pub color: SeatColor,
    /// Tile the creature currently occupies.
    pub at: GridCoord,
    /// Remaining hit points.
    pub hit_points: f64,
    /// Remaining mana.
    pub mana: f64,
    /// Experience level.
    pub level: u32,
    /// Experience accumulated toward the next level.
    pub experience: f64,
    /// Action currently at the front of the creature's queue.
    pub action: Option<CreatureAction>,
}

/// Read-only snapshot describing all creatures on the map.
#[derive(Clone, Debug, Default)]
pub struct CreatureView {
    snapshots: Vec<CreatureSnapshot>,
}

impl CreatureView {
    /// Creates a new creature view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CreatureSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &CreatureSnapshot> {
        self.snapshots.iter()
    }

    /// Number of creatures captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no creatures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<CreatureSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single room's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomSnapshot {
    /// Identifier allocated to the room by the world.
    pub id: RoomId,
    /// Kind of room that was built.
    pub kind: RoomKind,
    /// Seat owning the room.
    pub color: SeatColor,
    /// Tiles the room covers.
    pub covered: Vec<GridCoord>,
    /// Gold currently stored in the room.
    pub stored_gold: u32,
}

/// Read-only snapshot describing all rooms on the map.
#[derive(Clone, Debug, Default)]
pub struct RoomView {
    snapshots: Vec<RoomSnapshot>,
}

impl RoomView {
    /// Creates a new room view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<RoomSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &RoomSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<RoomSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single trap's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TrapSnapshot {
    /// Identifier allocated to the trap by the world.
    pub id: TrapId,
    /// Kind of trap that was buried.
    pub kind: TrapKind,
    /// Seat owning the trap.
    pub color: SeatColor,
    /// Tiles the trap covers.
    pub covered: Vec<GridCoord>,
    /// Turns remaining before the trap may trigger again.
    pub cooldown: u32,
}

/// Read-only snapshot describing all traps on the map.
#[derive(Clone, Debug, Default)]
pub struct TrapView {
    snapshots: Vec<TrapSnapshot>,
}

impl TrapView {
    /// Creates a new trap view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TrapSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &TrapSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TrapSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a missile in flight used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct MissileSnapshot {
    /// Identifier allocated to the missile by the world.
    pub id: MissileId,
    /// Seat the missile fights for.
    pub color: SeatColor,
    /// Tile the missile currently occupies.
    pub at: GridCoord,
    /// Damage the missile will inflict on impact.
    pub damage: f64,
}

/// Immutable representation of a map light used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct MapLightSnapshot {
    /// Identifier allocated to the light by the world.
    pub id: MapLightId,
    /// Tile the light sits on.
    pub at: GridCoord,
    /// Color the light emits.
    pub color: LightColor,
    /// Brightness of the light.
    pub intensity: f64,
}

/// Immutable representation of a single seat's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct SeatSnapshot {
    /// Color uniquely identifying the seat.
    pub color: SeatColor,
    /// Faction label carried by the seat.
    pub faction: String,
    /// Starting position recorded for the seat.
    pub starting: GridCoord,
    /// Whether the seat is bound to a player.
    pub filled: bool,
    /// Treasury gold available to the seat.
    pub gold: u32,
    /// Mana available to the seat.
    pub mana: u32,
    /// Mana gained during the most recent upkeep.
    pub mana_delta: u32,
    /// Tiles currently claimed by the seat.
    pub claimed_tiles: u32,
    /// Living creatures controlled by the seat.
    pub controlled_creatures: u32,
    /// Goals not yet satisfied.
    pub uncompleted_goals: u32,
    /// Goals currently satisfied.
    pub completed_goals: u32,
    /// Goals that can no longer be satisfied.
    pub failed_goals: u32,
    /// Whether the seat has entered the winners list.
    pub winner: bool,
}

/// Read-only snapshot describing all seats in the world.
#[derive(Clone, Debug, Default)]
pub struct SeatView {
    snapshots: Vec<SeatSnapshot>,
}

impl SeatView {
    /// Creates a new seat view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<SeatSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.color);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &SeatSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<SeatSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a player used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSnapshot {
    /// Player nickname.
    pub nick: String,
    /// Color of the seat the player holds.
    pub color: SeatColor,
    /// Whether the player is computer-controlled.
    pub is_ai: bool,
}
