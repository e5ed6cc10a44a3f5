//! Radial visibility sweep, Bresenham line of sight, and the visible-force
//! filter.

use std::collections::{HashSet, VecDeque};
use std::f64::consts::PI;

use grimhold_core::{GridCoord, RoomId, SeatColor, VisibleUnit};

use crate::creatures::CreatureRegistry;
use crate::rooms::RoomRegistry;
use crate::tiles::TileMap;

/// Largest sight radius the precomputed offset table supports.
pub(crate) const MAX_SIGHT_RADIUS: u32 = 32;

/// Half-width of the angular wedge an opaque tile shadows, divided by its
/// distance. The source material wavers between 1.5 and 3.0 for the full
/// wedge; the exact value is a tuning knob, not a correctness property.
pub(crate) const OCCLUSION_HALF_WIDTH: f64 = 1.5;

#[derive(Clone, Copy, Debug)]
struct RadialEntry {
    dx: i32,
    dy: i32,
    radius_squared: u32,
    theta: f64,
}

/// Offsets around a viewpoint ordered by increasing squared distance, each
/// with its polar angle cached. Built once per world and shared by every
/// visibility query.
#[derive(Clone, Debug)]
pub(crate) struct RadialMap {
    entries: Vec<RadialEntry>,
}

impl RadialMap {
    pub(crate) fn new(max_radius: u32) -> Self {
        let reach = max_radius as i32;
        let limit = max_radius * max_radius;
        let mut entries = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let radius_squared = (dx * dx + dy * dy) as u32;
                if radius_squared > limit {
                    continue;
                }
                let theta = normalize_angle(f64::from(dy).atan2(f64::from(dx)));
                entries.push(RadialEntry {
                    dx,
                    dy,
                    radius_squared,
                    theta,
                });
            }
        }
        entries.sort_by_key(|entry| entry.radius_squared);
        Self { entries }
    }
}

/// Computes every tile visible from the viewpoint within the given radius,
/// respecting occlusion.
///
/// Tiles are resolved nearest-first. A tile that blocks vision is itself
/// visible (the obstruction can be seen) but shadows an angular wedge behind
/// it; queued tiles whose cached angle falls strictly inside the wedge are
/// discarded unseen. A viewpoint that does not permit vision sees nothing.
pub(crate) fn visible_tiles(
    grid: &TileMap,
    radial: &RadialMap,
    from: GridCoord,
    radius: u32,
) -> Vec<GridCoord> {
    let Some(start) = grid.tile(from) else {
        return Vec::new();
    };
    if !start.permits_vision() {
        return Vec::new();
    }

    // Radii past the precomputed table are clamped to what the table holds.
    let radius = radius.min(MAX_SIGHT_RADIUS);
    let limit = radius * radius;

    let mut queue: VecDeque<(GridCoord, f64)> = VecDeque::new();
    for entry in &radial.entries {
        if entry.radius_squared > limit {
            break;
        }
        let at = GridCoord::new(from.x() + entry.dx, from.y() + entry.dy);
        if grid.contains(at) {
            queue.push_back((at, entry.theta));
        }
    }

    let mut visible = Vec::new();
    while let Some((at, _)) = queue.pop_front() {
        let Some(tile) = grid.tile(at) else {
            continue;
        };

        visible.push(at);
        if tile.permits_vision() {
            continue;
        }

        // The obstruction is as far as sight reaches along its direction;
        // everything queued inside its shadow wedge is discarded.
        let dx = f64::from(at.x() - from.x());
        let dy = f64::from(at.y() - from.y());
        let distance = (dx * dx + dy * dy).sqrt();
        let delta = OCCLUSION_HALF_WIDTH / distance;
        let center = normalize_angle(dy.atan2(dx));
        let small = normalize_angle(center - delta);
        let large = normalize_angle(center + delta);
        queue.retain(|&(_, theta)| !angle_strictly_between(small, large, theta));
    }

    visible
}

/// Rasterizes the sight line from `a` toward `b` into a 4-connected tile
/// corridor, exclusive of `b`.
///
/// Steep lines are walked with the axes swapped and emitted swapped back. An
/// extra tile is emitted at every cross-axis step so the corridor never
/// requires a diagonal move. The walk fails fast to an empty sequence the
/// moment it would cross a tile that does not exist, so nothing ever sees
/// through the map edge.
pub(crate) fn line_of_sight(grid: &TileMap, a: GridCoord, b: GridCoord) -> Vec<GridCoord> {
    let (mut x0, mut y0, mut x1, mut y1) = (a.x(), a.y(), b.x(), b.y());

    let steep = (y1 - y0).abs() >= (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }

    let mut dx = x1 - x0;
    let mut dy = y1 - y0;
    let xstep = if dx < 0 {
        dx = -dx;
        -1
    } else {
        1
    };
    let ystep = if dy < 0 {
        dy = -dy;
        -1
    } else {
        1
    };

    let two_dy = 2 * dy;
    let two_dy_minus_two_dx = two_dy - 2 * dx;
    let mut error = two_dy - dx;
    let mut y = y0;

    let mut corridor = Vec::new();
    let mut x = x0;
    while x != x1 {
        let emit = if steep {
            GridCoord::new(y, x)
        } else {
            GridCoord::new(x, y)
        };
        if grid.tile(emit).is_none() {
            return Vec::new();
        }
        corridor.push(emit);

        if error > 0 {
            let bridge = if steep {
                GridCoord::new(y, x + xstep)
            } else {
                GridCoord::new(x + xstep, y)
            };
            if grid.tile(bridge).is_none() {
                return Vec::new();
            }
            corridor.push(bridge);

            error += two_dy_minus_two_dx;
            y += ystep;
        } else {
            error += two_dy;
        }

        x += xstep;
    }

    corridor
}

/// Filters the creatures and rooms found on a visible-tile set by seat
/// color. With `invert` false, units belonging to `color` are returned; with
/// `invert` true, units belonging to anyone else. Rooms covering several
/// visible tiles are reported once.
pub(crate) fn visible_force(
    grid: &TileMap,
    creatures: &CreatureRegistry,
    rooms: &RoomRegistry,
    tiles: &[GridCoord],
    color: SeatColor,
    invert: bool,
) -> Vec<VisibleUnit> {
    let wanted = |unit_color: SeatColor| {
        if invert {
            unit_color != color
        } else {
            unit_color == color
        }
    };

    let mut force = Vec::new();
    let mut seen_rooms: HashSet<RoomId> = HashSet::new();

    for &at in tiles {
        let Some(tile) = grid.tile(at) else {
            continue;
        };

        for &occupant in tile.occupants() {
            if let Some(creature) = creatures.get(occupant) {
                if wanted(creature.color()) {
                    force.push(VisibleUnit::Creature(occupant));
                }
            }
        }

        if let Some(room_id) = tile.covering_room() {
            if let Some(room) = rooms.get(room_id) {
                if wanted(room.color()) && seen_rooms.insert(room_id) {
                    force.push(VisibleUnit::Room(room_id));
                }
            }
        }
    }

    force
}

fn normalize_angle(theta: f64) -> f64 {
    let mut normalized = theta % (2.0 * PI);
    if normalized < 0.0 {
        normalized += 2.0 * PI;
    }
    normalized
}

/// Whether `theta` lies strictly inside the arc swept counterclockwise from
/// `small` to `large`, with wrap-around at zero.
fn angle_strictly_between(small: f64, large: f64, theta: f64) -> bool {
    if small <= large {
        small < theta && theta < large
    } else {
        theta > small || theta < large
    }
}
