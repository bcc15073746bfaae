//! Food, virus and ejected-mass pixels.

use crate::config::Config;
use glam::Vec2;
use protocol::{Color, PixelKind, PixelRecord};

/// Drawn/collision radius of an ejected-mass pixel.
const EJECTED_RADIUS: f32 = 12.0;

/// A consumable or hazard pixel.
///
/// Velocity is nonzero only for ejected mass in post-ejection flight;
/// once it decays below the flight epsilon the pixel behaves like
/// stationary food (with a larger mass bonus on consumption).
#[derive(Debug, Clone)]
pub struct Pixel {
    pub id: String,
    pub position: Vec2,
    pub kind: PixelKind,
    pub color: Color,
    pub velocity: Vec2,
    /// Ejecting session, set only for ejected mass. Used to suppress
    /// immediate self-re-consumption while still in flight.
    pub owner: Option<String>,
}

impl Pixel {
    pub fn food(id: String, position: Vec2, color: Color) -> Self {
        Self {
            id,
            position,
            kind: PixelKind::Food,
            color,
            velocity: Vec2::ZERO,
            owner: None,
        }
    }

    pub fn virus(id: String, position: Vec2, color: Color) -> Self {
        Self {
            kind: PixelKind::Virus,
            ..Self::food(id, position, color)
        }
    }

    /// Ejected mass in flight, tagged with the owning session.
    pub fn ejected(
        id: String,
        position: Vec2,
        velocity: Vec2,
        color: Color,
        owner: String,
    ) -> Self {
        Self {
            id,
            position,
            kind: PixelKind::Ejected,
            color,
            velocity,
            owner: Some(owner),
        }
    }

    /// Normalize a persisted record into a pixel. Remote ejected mass
    /// arrives at rest (flight happens on the ejecting client), so no
    /// velocity or owner is reconstructed.
    pub fn from_record(rec: &PixelRecord) -> Self {
        // Malformed color column normalizes to default food.
        let (color, kind) = PixelKind::decode_color(&rec.color)
            .unwrap_or((Color::default(), PixelKind::Food));
        Self {
            id: rec.id.clone(),
            position: Vec2::new(rec.x, rec.y),
            kind,
            color,
            velocity: Vec2::ZERO,
            owner: None,
        }
    }

    /// Persisted shape of this pixel.
    pub fn to_record(&self, now: i64) -> PixelRecord {
        PixelRecord {
            id: self.id.clone(),
            x: self.position.x,
            y: self.position.y,
            color: self.kind.encode_color(self.color),
            updated_at: now,
        }
    }

    /// Collision radius by kind.
    pub fn radius(&self, config: &Config) -> f32 {
        match self.kind {
            PixelKind::Food => config.food.radius,
            PixelKind::Virus => config.virus.radius,
            PixelKind::Ejected => EJECTED_RADIUS,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}
