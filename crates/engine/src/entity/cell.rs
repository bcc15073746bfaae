//! Owned player cell.

use glam::Vec2;

/// Radius scale constant: radius = sqrt(100 * mass) = 10 * sqrt(mass).
const RADIUS_SCALE: f32 = 100.0;

/// Derive a cell's radius from its mass. Radius is never stored;
/// mass is the sole ground truth.
#[inline]
pub fn mass_to_radius(mass: f32) -> f32 {
    (RADIUS_SCALE * mass).sqrt()
}

/// Merge-eligibility state of an owned cell, derived from its age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePhase {
    /// Inside the cooldown window after creation/split; merging with
    /// siblings is disallowed, overlap only produces repel force.
    PostSplit,
    /// Cooldown elapsed; may merge once sufficiently overlapping.
    Mergeable,
}

/// A single mass-bearing cell owned and mutated by the local client.
#[derive(Debug, Clone)]
pub struct OwnedCell {
    /// Globally unique id, `{session}:{seq}`.
    pub id: String,
    /// Position in world coordinates.
    pub position: Vec2,
    /// Mass, the sole growth metric. Always > 0.
    pub mass: f32,
    /// Smoothed mass used only for rendering.
    pub display_mass: f32,
    /// Velocity, nonzero only while under an eject/split impulse.
    pub velocity: Vec2,
    /// Creation/split timestamp (ms), gates merge eligibility.
    pub born_at: f64,
}

impl OwnedCell {
    pub fn new(id: String, position: Vec2, mass: f32, now: f64) -> Self {
        Self {
            id,
            position,
            mass,
            display_mass: mass,
            velocity: Vec2::ZERO,
            born_at: now,
        }
    }

    /// Collision/drawn radius, recomputed from mass on every read.
    #[inline]
    pub fn radius(&self) -> f32 {
        mass_to_radius(self.mass)
    }

    /// Age since creation or last split, milliseconds.
    #[inline]
    pub fn age_ms(&self, now: f64) -> f64 {
        (now - self.born_at).max(0.0)
    }

    /// Merge phase at `now` for a given cooldown duration.
    pub fn merge_phase(&self, now: f64, cooldown_ms: f64) -> MergePhase {
        if self.age_ms(now) < cooldown_ms {
            MergePhase::PostSplit
        } else {
            MergePhase::Mergeable
        }
    }

    /// Restart the merge-cooldown clock (on split).
    pub fn restamp(&mut self, now: f64) {
        self.born_at = now;
    }
}
