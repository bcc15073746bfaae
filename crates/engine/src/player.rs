//! Local player state: the ordered collection of owned cells.

use crate::entity::OwnedCell;
use crate::world::WorldBounds;
use glam::Vec2;
use protocol::{CellRecord, CellSnapshot, Color, Identity, PositionBroadcast};
use rand::Rng;

/// Terminal/alive state surfaced to the external UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Alive,
    /// All owned cells eliminated; the simulation halts until respawn.
    Eliminated,
}

/// The local player's exclusively owned simulation state.
#[derive(Debug)]
pub struct LocalPlayer {
    /// Stable session id from the identity provider.
    pub session: String,
    pub name: String,
    pub color: Color,
    pub skin: Option<String>,
    pub show_name: bool,
    /// Owned cells, 1..=max while alive.
    pub cells: Vec<OwnedCell>,
    pub status: PlayerStatus,
    next_seq: u64,
}

impl LocalPlayer {
    pub fn new(identity: Identity) -> Self {
        Self {
            session: identity.id,
            name: identity.name,
            color: random_color(),
            skin: None,
            show_name: true,
            cells: Vec::with_capacity(16),
            status: PlayerStatus::Eliminated,
            next_seq: 0,
        }
    }

    /// Allocate a globally unique entity id. Owned cells and locally
    /// spawned pixels share the sequence.
    pub fn next_id(&mut self) -> String {
        self.next_seq += 1;
        format!("{}:{}", self.session, self.next_seq)
    }

    /// (Re)initialize with a single cell at a random position.
    pub fn spawn(&mut self, bounds: &WorldBounds, start_mass: f32, now: f64) -> &OwnedCell {
        // Spawn away from the very edge so the first clamp is a no-op.
        let mut rng = rand::rng();
        let half = bounds.half_extent / 2.0;
        let position = Vec2::new(rng.random_range(-half..half), rng.random_range(-half..half));
        let id = self.next_id();
        self.cells.clear();
        self.cells.push(OwnedCell::new(id, position, start_mass, now));
        self.status = PlayerStatus::Alive;
        &self.cells[0]
    }

    /// Aggregate mass across all owned cells (score display).
    pub fn total_mass(&self) -> f32 {
        self.cells.iter().map(|c| c.mass).sum()
    }

    /// Persisted rows for every owned cell.
    pub fn to_records(&self, now_ms: i64) -> Vec<CellRecord> {
        self.cells
            .iter()
            .map(|cell| CellRecord {
                id: cell.id.clone(),
                name: self.name.clone(),
                x: cell.position.x,
                y: cell.position.y,
                mass: cell.mass,
                color: self.color.to_hex(),
                skin: self.skin.clone(),
                show_name: self.show_name,
                updated_at: now_ms,
            })
            .collect()
    }

    /// Positional broadcast for the realtime room.
    pub fn to_broadcast(&self) -> PositionBroadcast {
        PositionBroadcast {
            session: self.session.clone(),
            name: self.name.clone(),
            color: self.color.to_hex(),
            cells: self
                .cells
                .iter()
                .map(|cell| CellSnapshot {
                    id: cell.id.clone(),
                    x: cell.position.x,
                    y: cell.position.y,
                    mass: cell.mass,
                })
                .collect(),
        }
    }
}

/// Random saturated cell color (hue spin at fixed saturation and
/// lightness, like the classic client's hsl(h, 80%, 60%)).
pub fn random_color() -> Color {
    let mut rng = rand::rng();
    hsl_to_rgb(rng.random_range(0.0..360.0), 0.8, 0.6)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Color {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h as u32 {
        0..60 => (c, x, 0.0),
        60..120 => (x, c, 0.0),
        120..180 => (0.0, c, x),
        180..240 => (0.0, x, c),
        240..300 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Color::new(
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
