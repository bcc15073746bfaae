//! Remote player cell.

use super::cell::mass_to_radius;
use glam::Vec2;
use protocol::{CellRecord, CellSnapshot, Color};

/// A cell owned by another session.
///
/// Carries a network *target* position/mass separate from the
/// *displayed* position/mass, which is interpolated toward the target
/// every tick. Created on first observation, removed on an explicit
/// delete or after the staleness window.
#[derive(Debug, Clone)]
pub struct RemoteCell {
    pub id: String,
    /// Owning session id, used to tell "mine" apart from remote cells
    /// sharing a display name.
    pub session: String,
    pub name: String,
    /// Displayed (interpolated) position.
    pub position: Vec2,
    /// Displayed (interpolated) mass.
    pub mass: f32,
    /// Last position received from the network.
    pub target_position: Vec2,
    /// Last mass received from the network.
    pub target_mass: f32,
    pub color: Color,
    pub skin: Option<String>,
    pub show_name: bool,
    /// Timestamp (ms) of the most recent observation.
    pub last_seen: f64,
}

impl RemoteCell {
    /// Build from a persisted record, normalizing at the boundary.
    /// A malformed color falls back to the default rather than failing:
    /// stale or foreign data is never an error.
    pub fn from_record(rec: &CellRecord, now: f64) -> Self {
        let position = Vec2::new(rec.x, rec.y);
        Self {
            id: rec.id.clone(),
            session: rec.session_id().to_string(),
            name: rec.name.clone(),
            position,
            mass: rec.mass,
            target_position: position,
            target_mass: rec.mass,
            color: Color::parse_hex(&rec.color).unwrap_or_default(),
            skin: rec.skin.clone(),
            show_name: rec.show_name,
            last_seen: now,
        }
    }

    /// Merge a durable record into this cell. The record carries full
    /// state, so targets move; displayed values keep interpolating.
    pub fn apply_record(&mut self, rec: &CellRecord, now: f64) {
        self.name = rec.name.clone();
        self.target_position = Vec2::new(rec.x, rec.y);
        self.target_mass = rec.mass;
        if let Ok(color) = Color::parse_hex(&rec.color) {
            self.color = color;
        }
        self.skin = rec.skin.clone();
        self.show_name = rec.show_name;
        self.last_seen = now;
    }

    /// Merge a broadcast snapshot: position and mass targets only.
    pub fn apply_snapshot(&mut self, snap: &CellSnapshot, now: f64) {
        self.target_position = Vec2::new(snap.x, snap.y);
        self.target_mass = snap.mass;
        self.last_seen = now;
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        mass_to_radius(self.mass)
    }

    /// True if nothing has been heard from this cell for the window.
    #[inline]
    pub fn is_stale(&self, now: f64, staleness_ms: f64) -> bool {
        now - self.last_seen > staleness_ms
    }
}
