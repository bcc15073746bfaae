//! Leaderboard aggregation: name-grouped mass ranking.

use crate::config::Config;
use crate::player::{LocalPlayer, PlayerStatus};
use crate::world::World;
use std::collections::HashMap;

/// Number of rows shown.
const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub mass: f32,
}

/// Throttled top-N ranking over all known entities, grouped by display
/// name so a split player's fragments count as one total.
#[derive(Debug)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    last_update: f64,
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            last_update: f64::NEG_INFINITY,
        }
    }
}

impl Leaderboard {
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Recompute if the throttle interval has elapsed. Returns whether
    /// a recompute happened, so the UI only redraws on change.
    pub fn update(
        &mut self,
        world: &World,
        player: &LocalPlayer,
        config: &Config,
        now: f64,
    ) -> bool {
        if now - self.last_update < config.sync.leaderboard_interval_ms {
            return false;
        }
        self.last_update = now;
        self.entries = compute(world, player);
        true
    }
}

/// Pure ranking: sum mass per display name, descending, top N.
pub fn compute(world: &World, player: &LocalPlayer) -> Vec<LeaderboardEntry> {
    let mut by_name: HashMap<&str, f32> = HashMap::new();
    for cell in world.remote_cells.values() {
        *by_name.entry(cell.name.as_str()).or_insert(0.0) += cell.mass;
    }
    if player.status == PlayerStatus::Alive {
        *by_name.entry(player.name.as_str()).or_insert(0.0) += player.total_mass();
    }

    let mut entries: Vec<LeaderboardEntry> = by_name
        .into_iter()
        .map(|(name, mass)| LeaderboardEntry {
            name: name.to_string(),
            mass,
        })
        .collect();
    // Name as tiebreaker keeps equal-mass ordering stable across ticks.
    entries.sort_by(|a, b| {
        b.mass
            .partial_cmp(&a.mass)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    entries.truncate(TOP_N);
    entries
}
