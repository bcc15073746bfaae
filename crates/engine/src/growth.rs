//! Growth state machine: split, eject, merge.
//!
//! All transitions operate on the owned-cell collection only. Mass is
//! conserved exactly across split and merge; eject destroys the fixed
//! eject cost minus the pixel's consumption value and nothing else.

use crate::config::Config;
use crate::entity::{mass_to_radius, MergePhase, OwnedCell, Pixel};
use crate::player::LocalPlayer;
use glam::Vec2;
use rand::Rng;
use tracing::debug;

/// Positional correction rate for overlapping unmergeable siblings,
/// fraction of the overlap depth resolved per second.
const REPEL_RATE: f32 = 15.0;

/// Speed at which mergeable-but-separated siblings are pulled
/// together, units/s.
const ATTRACT_SPEED: f32 = 80.0;

/// Random aim jitter applied to ejected mass, radians.
const EJECT_JITTER: f32 = 0.3;

/// Eject one pixel from every owned cell heavy enough, along the aim
/// direction. Returns the spawned pixels; the caller inserts them into
/// the entity model and persists them. Cells below the threshold are
/// silently skipped.
pub fn eject(player: &mut LocalPlayer, aim: Vec2, config: &Config) -> Vec<Pixel> {
    let mut spawned = Vec::new();
    let mut rng = rand::rng();

    for i in 0..player.cells.len() {
        if player.cells[i].mass <= config.eject.min_mass {
            continue;
        }

        let id = player.next_id();
        let cell = &mut player.cells[i];
        cell.mass -= config.eject.cost;

        let angle = aim.y.atan2(aim.x) + rng.random_range(-EJECT_JITTER..EJECT_JITTER);
        let dir = Vec2::new(angle.cos(), angle.sin());
        let origin = cell.position + dir * cell.radius();

        spawned.push(Pixel::ejected(
            id,
            origin,
            dir * config.eject.impulse,
            player.color,
            player.session.clone(),
        ));
    }

    if !spawned.is_empty() {
        debug!("Ejected {} pixels", spawned.len());
    }
    spawned
}

/// Split every owned cell heavy enough in half, child launched along
/// the aim direction. Both halves get a fresh merge-cooldown stamp.
/// Returns the new cell ids for the ownership index.
pub fn split(player: &mut LocalPlayer, aim: Vec2, config: &Config, now: f64) -> Vec<String> {
    let mut created = Vec::new();
    let initial = player.cells.len();

    for i in 0..initial {
        if player.cells.len() >= config.player.max_cells {
            break;
        }
        if player.cells[i].mass <= config.player.min_split_mass {
            continue;
        }

        let id = player.next_id();
        let cell = &mut player.cells[i];
        let half = cell.mass / 2.0;
        cell.mass = half;
        cell.restamp(now);

        let mut child = OwnedCell::new(
            id.clone(),
            cell.position + aim * mass_to_radius(half),
            half,
            now,
        );
        child.velocity = aim * config.player.split_impulse;
        player.cells.push(child);
        created.push(id);
    }

    created
}

/// Virus-forced split: burst one cell into up to `split_count` equal
/// children in random directions, capped by remaining capacity. The
/// popped cell becomes one of the children. Mass is conserved.
pub fn forced_split(
    player: &mut LocalPlayer,
    cell_index: usize,
    config: &Config,
    now: f64,
) -> Vec<String> {
    let capacity_left = config.player.max_cells.saturating_sub(player.cells.len());
    let pieces = config.virus.split_count.min(capacity_left + 1);
    if pieces <= 1 {
        return Vec::new();
    }

    let (origin, child_mass) = {
        let cell = &mut player.cells[cell_index];
        let child_mass = cell.mass / pieces as f32;
        cell.mass = child_mass;
        cell.restamp(now);
        (cell.position, child_mass)
    };

    let mut rng = rand::rng();
    let mut created = Vec::with_capacity(pieces - 1);
    for _ in 1..pieces {
        let id = player.next_id();
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let dir = Vec2::new(angle.cos(), angle.sin());
        let mut child = OwnedCell::new(id.clone(), origin, child_mass, now);
        child.velocity = dir * config.player.split_impulse;
        player.cells.push(child);
        created.push(id);
    }

    debug!("Forced split into {} pieces of mass {:.1}", pieces, child_mass);
    created
}

/// Merge pass over every unordered pair of owned cells.
///
/// Overlapping pairs merge when both are past cooldown and the overlap
/// passes the "mostly overlapping" threshold (center distance under
/// the larger radius). Otherwise the pair gets a corrective force:
/// repel by overlap depth while the cooldown runs, attract while
/// mergeable but not yet overlapping enough. Returns removed cell ids.
pub fn merge_pass(player: &mut LocalPlayer, config: &Config, now: f64, dt: f32) -> Vec<String> {
    let cooldown = config.player.merge_cooldown_ms;
    let n = player.cells.len();
    let mut absorbed = vec![false; n];

    for i in 0..n {
        if absorbed[i] {
            continue;
        }
        for j in (i + 1)..n {
            if absorbed[j] {
                continue;
            }

            let (a, b) = {
                let (lo, hi) = player.cells.split_at_mut(j);
                (&mut lo[i], &mut hi[0])
            };

            let r_a = a.radius();
            let r_b = b.radius();
            let mut offset = b.position - a.position;
            let mut dist = offset.length();

            if dist >= r_a + r_b {
                continue;
            }

            // Exact coincidence: perturb before deriving a direction.
            if dist < f32::EPSILON {
                let mut rng = rand::rng();
                let angle = rng.random_range(0.0..std::f32::consts::TAU);
                offset = Vec2::new(angle.cos(), angle.sin()) * 0.1;
                b.position += offset;
                dist = 0.1;
            }
            let dir = offset / dist;

            let both_mergeable = a.merge_phase(now, cooldown) == MergePhase::Mergeable
                && b.merge_phase(now, cooldown) == MergePhase::Mergeable;

            if both_mergeable && dist < r_a.max(r_b) {
                a.mass += b.mass;
                absorbed[j] = true;
            } else if both_mergeable {
                // Touching but not overlapping enough: pull together.
                let step = (ATTRACT_SPEED * dt).min(dist / 2.0);
                a.position += dir * step;
                b.position -= dir * step;
            } else {
                // Cooldown still running: push apart by overlap depth.
                let depth = r_a + r_b - dist;
                let step = 0.5 * depth * (REPEL_RATE * dt).min(1.0);
                a.position -= dir * step;
                b.position += dir * step;
            }
        }
    }

    let mut removed = Vec::new();
    for idx in (0..n).rev() {
        if absorbed[idx] {
            removed.push(player.cells.remove(idx).id);
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Identity;

    fn player_with(cells: Vec<OwnedCell>) -> LocalPlayer {
        let mut player = LocalPlayer::new(Identity {
            id: "me".to_string(),
            name: "Tester".to_string(),
        });
        player.cells = cells;
        player.status = crate::player::PlayerStatus::Alive;
        player
    }

    fn cell(seq: u32, pos: Vec2, mass: f32, born_at: f64) -> OwnedCell {
        OwnedCell::new(format!("me:{seq}"), pos, mass, born_at)
    }

    #[test]
    fn test_split_conserves_mass() {
        let config = Config::default();
        let mut player = player_with(vec![cell(1, Vec2::ZERO, 100.0, 0.0)]);
        let created = split(&mut player, Vec2::new(1.0, 0.0), &config, 1000.0);
        assert_eq!(created.len(), 1);
        assert_eq!(player.cells.len(), 2);
        assert!((player.total_mass() - 100.0).abs() < 1e-4);
        assert!((player.cells[0].mass - 50.0).abs() < 1e-4);
        // Both halves restart the cooldown clock.
        assert_eq!(player.cells[0].born_at, 1000.0);
        assert_eq!(player.cells[1].born_at, 1000.0);
    }

    #[test]
    fn test_split_below_threshold_is_noop() {
        let config = Config::default();
        let mut player = player_with(vec![cell(1, Vec2::ZERO, 20.0, 0.0)]);
        let created = split(&mut player, Vec2::new(1.0, 0.0), &config, 0.0);
        assert!(created.is_empty());
        assert_eq!(player.cells.len(), 1);
    }

    #[test]
    fn test_capacity_never_exceeds_max() {
        let config = Config::default();
        let mut player = player_with(vec![cell(1, Vec2::ZERO, 1_000_000.0, 0.0)]);
        for _ in 0..10 {
            split(&mut player, Vec2::new(1.0, 0.0), &config, 0.0);
        }
        assert!(player.cells.len() <= config.player.max_cells);
        assert_eq!(player.cells.len(), config.player.max_cells);
    }

    #[test]
    fn test_forced_split_scenario() {
        // Mass 200 pops into 8 children of 25 each, total unchanged.
        let config = Config::default();
        let mut player = player_with(vec![cell(1, Vec2::ZERO, 200.0, 0.0)]);
        let created = forced_split(&mut player, 0, &config, 0.0);
        assert_eq!(created.len(), 7);
        assert_eq!(player.cells.len(), 8);
        for c in &player.cells {
            assert!((c.mass - 25.0).abs() < 1e-4);
        }
        assert!((player.total_mass() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_forced_split_respects_capacity() {
        let config = Config::default();
        let mut cells: Vec<OwnedCell> = (0..14)
            .map(|i| cell(i, Vec2::new(i as f32 * 500.0, 0.0), 50.0, 0.0))
            .collect();
        cells.push(cell(99, Vec2::new(-1000.0, -1000.0), 200.0, 0.0));
        let mut player = player_with(cells);
        let created = forced_split(&mut player, 14, &config, 0.0);
        assert_eq!(player.cells.len(), config.player.max_cells);
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn test_merge_conserves_mass() {
        let config = Config::default();
        let past = -(config.player.merge_cooldown_ms + 1.0);
        let mut player = player_with(vec![
            cell(1, Vec2::ZERO, 60.0, past),
            cell(2, Vec2::new(5.0, 0.0), 40.0, past),
        ]);
        let removed = merge_pass(&mut player, &config, 0.0, 1.0 / 60.0);
        assert_eq!(removed, vec!["me:2".to_string()]);
        assert_eq!(player.cells.len(), 1);
        assert!((player.cells[0].mass - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_merge_cooldown_repels_instead() {
        let config = Config::default();
        // Fully overlapping but freshly split: must not merge.
        let mut player = player_with(vec![
            cell(1, Vec2::ZERO, 60.0, 0.0),
            cell(2, Vec2::new(5.0, 0.0), 40.0, 0.0),
        ]);
        let removed = merge_pass(&mut player, &config, 100.0, 1.0 / 60.0);
        assert!(removed.is_empty());
        assert_eq!(player.cells.len(), 2);
        // Repel force increased the separation.
        let dist = (player.cells[1].position - player.cells[0].position).length();
        assert!(dist > 5.0);
    }

    #[test]
    fn test_coincident_cells_get_perturbed() {
        let config = Config::default();
        let mut player = player_with(vec![
            cell(1, Vec2::ZERO, 50.0, 0.0),
            cell(2, Vec2::ZERO, 50.0, 0.0),
        ]);
        merge_pass(&mut player, &config, 100.0, 1.0 / 60.0);
        let dist = (player.cells[1].position - player.cells[0].position).length();
        assert!(dist > 0.0);
    }

    #[test]
    fn test_eject_costs_fixed_mass() {
        let config = Config::default();
        let mut player = player_with(vec![cell(1, Vec2::ZERO, 100.0, 0.0)]);
        let pixels = eject(&mut player, Vec2::new(1.0, 0.0), &config);
        assert_eq!(pixels.len(), 1);
        assert!((player.cells[0].mass - (100.0 - config.eject.cost)).abs() < 1e-4);
        let pixel = &pixels[0];
        assert_eq!(pixel.owner.as_deref(), Some("me"));
        assert!(pixel.speed() > config.eject.immunity_speed);
    }

    #[test]
    fn test_eject_below_threshold_is_noop() {
        let config = Config::default();
        let mut player = player_with(vec![cell(1, Vec2::ZERO, 20.0, 0.0)]);
        let pixels = eject(&mut player, Vec2::new(1.0, 0.0), &config);
        assert!(pixels.is_empty());
        assert!((player.cells[0].mass - 20.0).abs() < 1e-6);
    }
}
