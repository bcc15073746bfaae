//! Motion integration: impulses, steering, interpolation, camera.

use crate::config::Config;
use crate::input::InputSnapshot;
use crate::player::LocalPlayer;
use crate::world::World;
use glam::Vec2;

/// Below this speed an impulse is considered spent and control
/// reverts to steering (cells) or rest (pixels). Units/s.
pub const VELOCITY_EPSILON: f32 = 5.0;

/// Fraction of velocity retained after one second of friction.
const VELOCITY_DECAY_BASE: f32 = 0.02;

/// Interpolation rate toward remote targets, per second.
const REMOTE_LERP_RATE: f32 = 6.0;

/// Easing rate for the rendered mass, per second.
const DISPLAY_MASS_RATE: f32 = 6.0;

/// Speed falls off with mass: speed = base * (mass/start)^-0.3.
const SPEED_MASS_EXPONENT: f32 = -0.3;

/// Integrate one tick of motion.
///
/// Owned cells under an active impulse fly and decay; otherwise they
/// steer toward the pointer at a mass-scaled speed. In-flight pixels
/// decay to rest. Remote cells ease toward their network targets.
/// Every owned position is clamped into the world afterward.
///
/// Returns the ids of ejected pixels that came to rest this tick, so
/// the caller can persist their final position.
pub fn integrate(
    player: &mut LocalPlayer,
    world: &mut World,
    input: &InputSnapshot,
    config: &Config,
    dt: f32,
) -> Vec<String> {
    let decay = VELOCITY_DECAY_BASE.powf(dt);
    let steer = input.steer_direction();

    for cell in &mut player.cells {
        if cell.velocity.length() > VELOCITY_EPSILON {
            cell.position += cell.velocity * dt;
            cell.velocity *= decay;
        } else {
            cell.velocity = Vec2::ZERO;
            if let Some(dir) = steer {
                let speed = config.player.speed
                    * (cell.mass / config.player.start_mass).powf(SPEED_MASS_EXPONENT);
                cell.position += dir * speed * dt;
            }
        }
        cell.position = world.bounds.clamp(cell.position);
        cell.display_mass += (cell.mass - cell.display_mass) * (DISPLAY_MASS_RATE * dt).min(1.0);
    }

    let mut rested = Vec::new();
    let bounds = world.bounds;
    for pixel in world.pixels.values_mut() {
        if pixel.speed() <= VELOCITY_EPSILON {
            continue;
        }
        pixel.position += pixel.velocity * dt;
        pixel.velocity *= decay;
        pixel.position = bounds.clamp(pixel.position);
        if pixel.speed() <= VELOCITY_EPSILON {
            // Decayed to a quiescent, food-like pixel.
            pixel.velocity = Vec2::ZERO;
            rested.push(pixel.id.clone());
        }
    }

    let t = (REMOTE_LERP_RATE * dt).min(1.0);
    for remote in world.remote_cells.values_mut() {
        remote.position += (remote.target_position - remote.position) * t;
        remote.mass += (remote.target_mass - remote.mass) * t;
    }

    rested
}

/// Mass-weighted center of the owned cells, for camera tracking.
/// `None` while eliminated.
pub fn camera_center(player: &LocalPlayer) -> Option<Vec2> {
    let total = player.total_mass();
    if player.cells.is_empty() || total <= 0.0 {
        return None;
    }
    let weighted: Vec2 = player
        .cells
        .iter()
        .map(|c| c.position * c.mass)
        .sum::<Vec2>();
    Some(weighted / total)
}
