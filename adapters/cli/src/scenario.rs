//! TOML scenario files: the level-loading boundary of the CLI adapter.
//!
//! A scenario describes the initial tile grid, seats, players, rooms,
//! creatures and goals of a level. Loading stays out of the world crate;
//! the adapter replays the scenario as ordinary commands.

use std::path::Path;

use grimhold_core::{
    Command, CreatureKind, Goal, GridCoord, LightColor, RoomKind, SeatColor, TileKind,
};
use serde::Deserialize;

/// Failures while reading a scenario file.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ScenarioError {
    /// The file could not be read.
    #[error("reading scenario file")]
    Io(#[from] std::io::Error),
    /// The file is not valid scenario TOML.
    #[error("parsing scenario file")]
    Parse(#[from] toml::de::Error),
}

/// A complete level description replayable as bootstrap commands.
#[derive(Debug, Deserialize)]
pub(crate) struct Scenario {
    map: MapSection,
    #[serde(default)]
    carve: Vec<CarveSection>,
    #[serde(default)]
    tiles: Vec<TileSection>,
    #[serde(default)]
    goals: Vec<Goal>,
    #[serde(default)]
    seats: Vec<SeatSection>,
    #[serde(default)]
    rooms: Vec<RoomSection>,
    #[serde(default)]
    creatures: Vec<CreatureSection>,
    #[serde(default)]
    lights: Vec<LightSection>,
    #[serde(default = "default_flood_fill")]
    flood_fill: bool,
}

fn default_flood_fill() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct MapSection {
    width: u32,
    height: u32,
}

/// Rectangle of tiles overwritten with one terrain.
#[derive(Debug, Deserialize)]
struct CarveSection {
    from: [i32; 2],
    to: [i32; 2],
    kind: TileKind,
    fullness: f64,
    owner: Option<u32>,
}

/// Single tile overwrite; applied after the carve rectangles.
#[derive(Debug, Deserialize)]
struct TileSection {
    x: i32,
    y: i32,
    kind: TileKind,
    fullness: f64,
    owner: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SeatSection {
    color: u32,
    faction: String,
    starting: [i32; 2],
    /// Nickname of the player bound to the seat; seats without one stay
    /// empty.
    nick: Option<String>,
    #[serde(default)]
    ai: bool,
}

#[derive(Debug, Deserialize)]
struct RoomSection {
    kind: RoomKind,
    color: u32,
    tiles: Vec<[i32; 2]>,
}

#[derive(Debug, Deserialize)]
struct CreatureSection {
    kind: CreatureKind,
    color: u32,
    x: i32,
    y: i32,
}

#[derive(Debug, Deserialize)]
struct LightSection {
    x: i32,
    y: i32,
    rgb: [u8; 3],
    intensity: f64,
}

impl Scenario {
    /// Built-in two-keeper skirmish used when no scenario file is given.
    pub(crate) fn demo() -> Self {
        Self {
            map: MapSection {
                width: 18,
                height: 12,
            },
            carve: vec![
                // Western dungeon pocket.
                CarveSection {
                    from: [2, 2],
                    to: [6, 7],
                    kind: TileKind::Dirt,
                    fullness: 0.0,
                    owner: None,
                },
                CarveSection {
                    from: [3, 3],
                    to: [5, 5],
                    kind: TileKind::Claimed,
                    fullness: 0.0,
                    owner: Some(1),
                },
                // Eastern dungeon pocket.
                CarveSection {
                    from: [11, 3],
                    to: [15, 8],
                    kind: TileKind::Dirt,
                    fullness: 0.0,
                    owner: None,
                },
                CarveSection {
                    from: [12, 4],
                    to: [14, 6],
                    kind: TileKind::Claimed,
                    fullness: 0.0,
                    owner: Some(2),
                },
            ],
            tiles: vec![
                TileSection {
                    x: 8,
                    y: 5,
                    kind: TileKind::Gold,
                    fullness: 1.0,
                    owner: None,
                },
                TileSection {
                    x: 8,
                    y: 6,
                    kind: TileKind::Gold,
                    fullness: 1.0,
                    owner: None,
                },
                TileSection {
                    x: 9,
                    y: 5,
                    kind: TileKind::Gold,
                    fullness: 1.0,
                    owner: None,
                },
            ],
            goals: vec![Goal::ProtectTemple, Goal::ClaimTiles { count: 20 }],
            seats: vec![
                SeatSection {
                    color: 1,
                    faction: "ember".to_owned(),
                    starting: [4, 4],
                    nick: Some("ember".to_owned()),
                    ai: false,
                },
                SeatSection {
                    color: 2,
                    faction: "gob".to_owned(),
                    starting: [13, 5],
                    nick: Some("gob".to_owned()),
                    ai: true,
                },
            ],
            rooms: vec![
                RoomSection {
                    kind: RoomKind::DungeonTemple,
                    color: 1,
                    tiles: vec![[3, 3], [4, 3]],
                },
                RoomSection {
                    kind: RoomKind::DungeonTemple,
                    color: 2,
                    tiles: vec![[13, 4], [14, 4]],
                },
            ],
            creatures: vec![
                CreatureSection {
                    kind: CreatureKind::Fighter,
                    color: 1,
                    x: 5,
                    y: 5,
                },
                CreatureSection {
                    kind: CreatureKind::Fighter,
                    color: 2,
                    x: 12,
                    y: 6,
                },
            ],
            lights: vec![LightSection {
                x: 4,
                y: 4,
                rgb: [255, 220, 180],
                intensity: 0.8,
            }],
            flood_fill: true,
        }
    }

    /// Commands that reproduce the scenario on a fresh world, in replay
    /// order: grid, terrain, goals, seats, players, rooms, creatures,
    /// lights, and finally the connectivity cache.
    pub(crate) fn bootstrap_commands(&self) -> Vec<Command> {
        let mut commands = vec![Command::CreateMap {
            width: self.map.width,
            height: self.map.height,
        }];

        for carve in &self.carve {
            let min_x = carve.from[0].min(carve.to[0]);
            let max_x = carve.from[0].max(carve.to[0]);
            let min_y = carve.from[1].min(carve.to[1]);
            let max_y = carve.from[1].max(carve.to[1]);
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    commands.push(Command::SetTile {
                        at: GridCoord::new(x, y),
                        kind: carve.kind,
                        fullness: carve.fullness,
                        owner: carve.owner.map(SeatColor::new),
                    });
                }
            }
        }
        for tile in &self.tiles {
            commands.push(Command::SetTile {
                at: GridCoord::new(tile.x, tile.y),
                kind: tile.kind,
                fullness: tile.fullness,
                owner: tile.owner.map(SeatColor::new),
            });
        }

        for &goal in &self.goals {
            commands.push(Command::AddGoal { goal });
        }

        for seat in &self.seats {
            commands.push(Command::AddSeat {
                color: SeatColor::new(seat.color),
                faction: seat.faction.clone(),
                starting: GridCoord::new(seat.starting[0], seat.starting[1]),
            });
        }
        for seat in &self.seats {
            if let Some(nick) = &seat.nick {
                commands.push(Command::AddPlayer {
                    nick: nick.clone(),
                    color: SeatColor::new(seat.color),
                    is_ai: seat.ai,
                });
            }
        }

        for room in &self.rooms {
            commands.push(Command::PlaceRoom {
                kind: room.kind,
                color: SeatColor::new(room.color),
                tiles: room
                    .tiles
                    .iter()
                    .map(|&[x, y]| GridCoord::new(x, y))
                    .collect(),
            });
        }
        for creature in &self.creatures {
            commands.push(Command::SpawnCreature {
                kind: creature.kind,
                color: SeatColor::new(creature.color),
                at: GridCoord::new(creature.x, creature.y),
            });
        }
        for light in &self.lights {
            commands.push(Command::AddMapLight {
                at: GridCoord::new(light.x, light.y),
                color: LightColor::from_rgb(light.rgb[0], light.rgb[1], light.rgb[2]),
                intensity: light.intensity,
            });
        }

        if self.flood_fill {
            commands.push(Command::EnableFloodFill);
        }

        commands
    }

    /// Colors of the seats a keeper AI should play.
    pub(crate) fn ai_colors(&self) -> impl Iterator<Item = SeatColor> + '_ {
        self.seats
            .iter()
            .filter(|seat| seat.ai)
            .map(|seat| SeatColor::new(seat.color))
    }
}

/// Reads and parses a scenario file.
pub(crate) fn load(path: &Path) -> Result<Scenario, ScenarioError> {
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scenario_replays_in_bootstrap_order() {
        let scenario = Scenario::demo();
        let commands = scenario.bootstrap_commands();

        assert!(matches!(commands.first(), Some(Command::CreateMap { .. })));
        assert!(matches!(commands.last(), Some(Command::EnableFloodFill)));
        assert_eq!(scenario.ai_colors().collect::<Vec<_>>(), vec![SeatColor::new(2)]);
    }

    #[test]
    fn scenario_toml_parses_every_section() {
        let text = r#"
            [map]
            width = 8
            height = 6

            [[carve]]
            from = [1, 1]
            to = [3, 3]
            kind = "Dirt"
            fullness = 0.0

            [[tiles]]
            x = 4
            y = 2
            kind = "Gold"
            fullness = 1.0

            [[goals]]
            [goals.ClaimTiles]
            count = 10

            [[seats]]
            color = 1
            faction = "ember"
            starting = [2, 2]
            nick = "ember"
            ai = true

            [[rooms]]
            kind = "DungeonTemple"
            color = 1
            tiles = [[2, 2]]

            [[creatures]]
            kind = "Worker"
            color = 1
            x = 2
            y = 3

            [[lights]]
            x = 2
            y = 2
            rgb = [255, 255, 255]
            intensity = 1.0
        "#;

        let scenario: Scenario = toml::from_str(text).expect("scenario parses");

        assert_eq!(scenario.map.width, 8);
        assert_eq!(scenario.carve.len(), 1);
        assert_eq!(scenario.tiles.len(), 1);
        assert_eq!(scenario.goals, vec![Goal::ClaimTiles { count: 10 }]);
        assert_eq!(scenario.seats.len(), 1);
        assert_eq!(scenario.rooms.len(), 1);
        assert_eq!(scenario.creatures.len(), 1);
        assert_eq!(scenario.lights.len(), 1);
        assert!(scenario.flood_fill);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let scenario: Scenario = toml::from_str("[map]\nwidth = 4\nheight = 4\n")
            .expect("scenario parses");
        assert!(scenario.seats.is_empty());
        assert!(scenario.bootstrap_commands().len() >= 2);
    }
}
