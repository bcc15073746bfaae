//! Spatial collision engine: consumption and kill decisions.
//!
//! Broad phase is a radius-expanded AABB rejection, narrow phase a
//! Euclidean center-distance check. The engine mutates owned cells
//! (mass gains, forced splits, removals) but never touches the entity
//! model directly: every remote-entity removal is returned as a
//! decision for the sync layer to apply through its canonical
//! mutation path.

use crate::config::Config;
use crate::growth;
use crate::player::{LocalPlayer, PlayerStatus};
use crate::world::World;
use glam::Vec2;
use protocol::PixelKind;
use std::collections::HashSet;
use tracing::debug;

/// Mass multiple one entity must strictly exceed another by to
/// consume it. Symmetric: below the ratio in both directions, overlap
/// is pass-through.
pub const DOMINANCE_RATIO: f32 = 1.25;

/// Decisions produced by one collision pass.
#[derive(Debug, Default)]
pub struct CollisionReport {
    /// Pixels consumed: remove locally, delete durably.
    pub eaten_pixels: Vec<String>,
    /// Enemy cells eaten: optimistic local removal; the authoritative
    /// delete arrives later from the loser.
    pub eaten_remote: Vec<String>,
    /// Own cells lost to larger enemies: delete durably.
    pub lost_cells: Vec<String>,
    /// Cells created by virus pops, for the ownership index.
    pub created_cells: Vec<String>,
    /// All owned cells are gone; simulation halts until respawn.
    pub eliminated: bool,
}

/// Radius-expanded axis-aligned bounding box rejection.
#[inline]
fn aabb_overlap(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    (a_pos.x - b_pos.x).abs() <= reach && (a_pos.y - b_pos.y).abs() <= reach
}

/// Mass-equivalent of a virus, derived from its fixed radius through
/// the same radius law cells use.
#[inline]
fn virus_mass_equivalent(radius: f32) -> f32 {
    radius * radius / 100.0
}

/// Run one collision pass over every owned cell.
///
/// Cells are processed from last to first index so in-place removal
/// never skips an entry; within each cell, pixels are evaluated before
/// enemies.
pub fn resolve(
    player: &mut LocalPlayer,
    world: &World,
    config: &Config,
    now: f64,
) -> CollisionReport {
    let mut report = CollisionReport::default();
    let mut consumed: HashSet<&str> = HashSet::new();

    let initial = player.cells.len();
    for idx in (0..initial).rev() {
        // Pixels: food, ejected mass, viruses.
        let mut popped = false;
        for pixel in world.pixels.values() {
            if consumed.contains(pixel.id.as_str()) {
                continue;
            }
            let cell = &player.cells[idx];
            let (cell_pos, cell_radius) = (cell.position, cell.radius());
            if !aabb_overlap(cell_pos, cell_radius, pixel.position, pixel.radius(config)) {
                continue;
            }
            if cell_pos.distance(pixel.position) >= cell_radius {
                continue;
            }

            match pixel.kind {
                PixelKind::Food => {
                    player.cells[idx].mass += config.food.mass_gain;
                    consumed.insert(pixel.id.as_str());
                    report.eaten_pixels.push(pixel.id.clone());
                }
                PixelKind::Ejected => {
                    // Just-ejected mass is immune to its own cell
                    // while still in flight.
                    let own = pixel.owner.as_deref() == Some(player.session.as_str());
                    if own && pixel.speed() > config.eject.immunity_speed {
                        continue;
                    }
                    player.cells[idx].mass += config.eject.gain;
                    consumed.insert(pixel.id.as_str());
                    report.eaten_pixels.push(pixel.id.clone());
                }
                PixelKind::Virus => {
                    let threshold = DOMINANCE_RATIO * virus_mass_equivalent(pixel.radius(config));
                    if player.cells[idx].mass <= threshold {
                        continue; // inert geometry below the threshold
                    }
                    consumed.insert(pixel.id.as_str());
                    report.eaten_pixels.push(pixel.id.clone());
                    report
                        .created_cells
                        .extend(growth::forced_split(player, idx, config, now));
                    popped = true;
                }
            }
            if popped {
                break;
            }
        }

        // Enemies.
        let mut cell_removed = false;
        for remote in world.remote_cells.values() {
            if report.eaten_remote.iter().any(|id| id == &remote.id) {
                continue;
            }
            let cell = &player.cells[idx];
            let (cell_radius, remote_radius) = (cell.radius(), remote.radius());
            if !aabb_overlap(cell.position, cell_radius, remote.position, remote_radius) {
                continue;
            }
            let dist = cell.position.distance(remote.position);

            if cell.mass > DOMINANCE_RATIO * remote.mass && dist < cell_radius {
                // Local bonus rather than exact transfer; the loser
                // settles its own fate when it observes this state.
                let gain = remote.mass / 2.0;
                player.cells[idx].mass += gain;
                report.eaten_remote.push(remote.id.clone());
                debug!("Ate remote cell {} (+{:.1} mass)", remote.id, gain);
            } else if remote.mass > DOMINANCE_RATIO * cell.mass && dist < remote_radius {
                let removed = player.cells.remove(idx);
                report.lost_cells.push(removed.id);
                cell_removed = true;
                break;
            }
        }

        if cell_removed && player.cells.is_empty() {
            player.status = PlayerStatus::Eliminated;
            report.eliminated = true;
            break;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{OwnedCell, Pixel, RemoteCell};
    use protocol::{CellRecord, Color, Identity};

    fn test_player(mass: f32) -> LocalPlayer {
        let mut player = LocalPlayer::new(Identity {
            id: "me".to_string(),
            name: "Tester".to_string(),
        });
        player
            .cells
            .push(OwnedCell::new("me:1".to_string(), Vec2::ZERO, mass, 0.0));
        player.status = PlayerStatus::Alive;
        player
    }

    fn remote_at(id: &str, pos: Vec2, mass: f32) -> RemoteCell {
        RemoteCell::from_record(
            &CellRecord {
                id: id.to_string(),
                name: "enemy".to_string(),
                x: pos.x,
                y: pos.y,
                mass,
                color: "#ff0000".to_string(),
                skin: None,
                show_name: true,
                updated_at: 0,
            },
            0.0,
        )
    }

    #[test]
    fn test_feed_and_grow() {
        // A cell of mass 10 consumes 3 food pixels -> mass 13.
        let config = Config::default();
        let mut player = test_player(10.0);
        let mut world = World::new(2000.0);
        for i in 0..3 {
            world.insert_pixel(Pixel::food(
                format!("f{i}"),
                Vec2::new(i as f32 * 2.0, 0.0),
                Color::default(),
            ));
        }
        let report = resolve(&mut player, &world, &config, 0.0);
        assert_eq!(report.eaten_pixels.len(), 3);
        assert!((player.cells[0].mass - 13.0).abs() < 1e-4);
    }

    #[test]
    fn test_self_eject_immunity_while_in_flight() {
        let config = Config::default();
        let mut player = test_player(100.0);
        let mut world = World::new(2000.0);
        let mut pixel = Pixel::ejected(
            "p1".to_string(),
            Vec2::new(5.0, 0.0),
            Vec2::new(600.0, 0.0),
            Color::default(),
            "me".to_string(),
        );
        world.insert_pixel(pixel.clone());
        let report = resolve(&mut player, &world, &config, 0.0);
        assert!(report.eaten_pixels.is_empty());

        // Once the pixel has slowed below the immunity threshold the
        // owner may re-consume it.
        pixel.velocity = Vec2::new(10.0, 0.0);
        world.insert_pixel(pixel);
        let report = resolve(&mut player, &world, &config, 0.0);
        assert_eq!(report.eaten_pixels, vec!["p1".to_string()]);
        assert!((player.cells[0].mass - (100.0 + config.eject.gain)).abs() < 1e-4);
    }

    #[test]
    fn test_foreign_eject_is_fair_game_in_flight() {
        let config = Config::default();
        let mut player = test_player(100.0);
        let mut world = World::new(2000.0);
        world.insert_pixel(Pixel::ejected(
            "p1".to_string(),
            Vec2::new(5.0, 0.0),
            Vec2::new(600.0, 0.0),
            Color::default(),
            "other".to_string(),
        ));
        let report = resolve(&mut player, &world, &config, 0.0);
        assert_eq!(report.eaten_pixels, vec!["p1".to_string()]);
    }

    #[test]
    fn test_dominance_rule_eats_smaller() {
        let config = Config::default();
        let mut player = test_player(50.0);
        let mut world = World::new(2000.0);
        world.insert_remote_cell(remote_at("them:1", Vec2::new(10.0, 0.0), 30.0));
        let report = resolve(&mut player, &world, &config, 0.0);
        assert_eq!(report.eaten_remote, vec!["them:1".to_string()]);
        // Gains half the victim's mass.
        assert!((player.cells[0].mass - 65.0).abs() < 1e-4);
    }

    #[test]
    fn test_dominance_rule_pass_through_within_ratio() {
        let config = Config::default();
        let mut player = test_player(40.0);
        let mut world = World::new(2000.0);
        // 40 vs 35: neither exceeds 1.25x the other.
        world.insert_remote_cell(remote_at("them:1", Vec2::new(5.0, 0.0), 35.0));
        let report = resolve(&mut player, &world, &config, 0.0);
        assert!(report.eaten_remote.is_empty());
        assert!(report.lost_cells.is_empty());
        assert!((player.cells[0].mass - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_larger_enemy_eliminates_last_cell() {
        let config = Config::default();
        let mut player = test_player(10.0);
        let mut world = World::new(2000.0);
        world.insert_remote_cell(remote_at("them:1", Vec2::new(5.0, 0.0), 100.0));
        let report = resolve(&mut player, &world, &config, 0.0);
        assert_eq!(report.lost_cells, vec!["me:1".to_string()]);
        assert!(report.eliminated);
        assert_eq!(player.status, PlayerStatus::Eliminated);
        assert!(player.cells.is_empty());
    }

    #[test]
    fn test_virus_pops_heavy_cell() {
        // Mass 200 over a virus: replaced by 8 children of 25 each.
        let config = Config::default();
        let mut player = test_player(200.0);
        let mut world = World::new(2000.0);
        world.insert_pixel(Pixel::virus(
            "v1".to_string(),
            Vec2::new(1.0, 0.0),
            Color::default(),
        ));
        let report = resolve(&mut player, &world, &config, 0.0);
        assert_eq!(report.eaten_pixels, vec!["v1".to_string()]);
        assert_eq!(player.cells.len(), 8);
        assert!((player.total_mass() - 200.0).abs() < 1e-3);
        assert_eq!(report.created_cells.len(), 7);
    }

    #[test]
    fn test_virus_is_inert_for_small_cells() {
        let config = Config::default();
        let mut player = test_player(12.0);
        let mut world = World::new(2000.0);
        world.insert_pixel(Pixel::virus(
            "v1".to_string(),
            Vec2::ZERO,
            Color::default(),
        ));
        let report = resolve(&mut player, &world, &config, 0.0);
        assert!(report.eaten_pixels.is_empty());
        assert_eq!(player.cells.len(), 1);
    }
}
