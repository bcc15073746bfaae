//! Shared protocol crate for the petri arena.
//!
//! This crate contains:
//! - Persisted record shapes for the two store tables (cells, pixels)
//! - Change-notification and broadcast event types
//! - The outbound operation set a host transport must implement
//! - Shared types (Color, Identity, pixel kind tagging)
//!
//! The realtime channel and persisted store themselves are external;
//! this crate is the contract they are driven through.

mod error;
mod records;

pub use error::RecordError;
pub use records::{
    CellChange, CellRecord, CellSnapshot, ChangeOp, InboundEvent, Outbound, PixelChange,
    PixelKind, PixelRecord, PositionBroadcast,
};

/// Stable user identity delivered by the external identity provider
/// after sign-in. Opaque to the engine beyond equality on `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Session/user id, globally unique.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// RGB color used for cells and pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Encode as a CSS hex string (`#rrggbb`).
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse a CSS hex string (`#rrggbb`).
    pub fn parse_hex(s: &str) -> Result<Self, RecordError> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 {
            return Err(RecordError::InvalidColor(s.to_string()));
        }
        let byte = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| RecordError::InvalidColor(s.to_string()))
        };
        Ok(Self {
            r: byte(0..2)?,
            g: byte(2..4)?,
            b: byte(4..6)?,
        })
    }
}
