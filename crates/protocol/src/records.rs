//! Persisted record shapes and sync events.
//!
//! Two logical record kinds exist in the store: cells (one row per
//! player cell) and pixels (food, viruses, ejected mass). Pixels carry
//! their sub-kind inline in the color column with a reserved `::`
//! suffix so the table schema stays two columns of geometry plus one
//! string.

use crate::{Color, RecordError};
use serde::{Deserialize, Serialize};

/// Kind of a pixel entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelKind {
    /// Plain food pellet.
    #[default]
    Food,
    /// Virus hazard (fixed larger radius, pops big cells).
    Virus,
    /// Mass ejected by a player, consumable with a brief self-immunity.
    Ejected,
}

impl PixelKind {
    /// Encode a color plus kind into the persisted color column.
    pub fn encode_color(self, color: Color) -> String {
        match self {
            PixelKind::Food => color.to_hex(),
            PixelKind::Virus => format!("{}::v", color.to_hex()),
            PixelKind::Ejected => format!("{}::e", color.to_hex()),
        }
    }

    /// Decode the persisted color column into `(color, kind)`.
    ///
    /// Unknown suffixes normalize to plain food rather than erroring:
    /// stale rows written by newer clients must never break a reader.
    pub fn decode_color(s: &str) -> Result<(Color, PixelKind), RecordError> {
        let (hex, kind) = match s.split_once("::") {
            Some((hex, "v")) => (hex, PixelKind::Virus),
            Some((hex, "e")) => (hex, PixelKind::Ejected),
            Some((hex, _)) => (hex, PixelKind::Food),
            None => (s, PixelKind::Food),
        };
        Ok((Color::parse_hex(hex)?, kind))
    }
}

/// Persisted row of the cell ("players") table.
///
/// The store column for mass is historically named `size`; the serde
/// rename keeps wire compatibility while the engine talks mass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "size")]
    pub mass: f32,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<String>,
    #[serde(default = "default_show_name")]
    pub show_name: bool,
    /// Last-update timestamp, milliseconds since epoch.
    pub updated_at: i64,
}

fn default_show_name() -> bool {
    true
}

impl CellRecord {
    /// Owning session id, i.e. everything before the cell sequence
    /// suffix. Cell ids are `{session}:{seq}`.
    pub fn session_id(&self) -> &str {
        self.id.rsplit_once(':').map(|(s, _)| s).unwrap_or(&self.id)
    }
}

/// Persisted row of the pixel table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelRecord {
    pub id: String,
    pub x: f32,
    pub y: f32,
    /// Color column, kind-tagged (see [`PixelKind`]).
    pub color: String,
    pub updated_at: i64,
}

/// Operation tag on a store change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Store change notification for the cell table.
#[derive(Debug, Clone)]
pub struct CellChange {
    pub op: ChangeOp,
    pub record: CellRecord,
}

/// Store change notification for the pixel table.
#[derive(Debug, Clone)]
pub struct PixelChange {
    pub op: ChangeOp,
    pub record: PixelRecord,
}

/// One cell inside a positional broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub mass: f32,
}

/// High-frequency positional broadcast published to the game room.
///
/// Best-effort and unordered: carries enough identity (name, color) to
/// create a remote cell on first observation without waiting for the
/// durable insert to arrive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionBroadcast {
    pub session: String,
    pub name: String,
    pub color: String,
    pub cells: Vec<CellSnapshot>,
}

/// Inbound sync event, delivered between ticks on the cooperative
/// queue. Ordering relative to local logic is not guaranteed.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Cell(CellChange),
    Pixel(PixelChange),
    Broadcast(PositionBroadcast),
}

/// Outbound operation enqueued by the engine and drained by the host
/// transport. All of these are fire-and-forget: a failed send is
/// logged by the transport and superseded by the next interval.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Publish to the realtime room (no persistence).
    Broadcast(PositionBroadcast),
    /// Batch upsert into the cell table.
    UpsertCells(Vec<CellRecord>),
    /// Batch delete from the cell table by id.
    DeleteCells(Vec<String>),
    /// Delete cell rows with `updated_at` older than the timestamp.
    DeleteCellsOlderThan(i64),
    /// Batch upsert into the pixel table.
    UpsertPixels(Vec<PixelRecord>),
    /// Batch delete from the pixel table by id.
    DeletePixels(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_kind_suffix_roundtrip() {
        let c = Color::new(255, 0, 128);
        let encoded = PixelKind::Virus.encode_color(c);
        assert_eq!(encoded, "#ff0080::v");
        let (color, kind) = PixelKind::decode_color(&encoded).unwrap();
        assert_eq!(color, c);
        assert_eq!(kind, PixelKind::Virus);
    }

    #[test]
    fn test_unknown_suffix_decodes_as_food() {
        let (color, kind) = PixelKind::decode_color("#336699::z").unwrap();
        assert_eq!(color, Color::new(0x33, 0x66, 0x99));
        assert_eq!(kind, PixelKind::Food);
    }

    #[test]
    fn test_untagged_color_is_food() {
        let (_, kind) = PixelKind::decode_color("#010203").unwrap();
        assert_eq!(kind, PixelKind::Food);
    }

    #[test]
    fn test_cell_record_session_id() {
        let rec = CellRecord {
            id: "user-abc:3".to_string(),
            name: "p".to_string(),
            x: 0.0,
            y: 0.0,
            mass: 10.0,
            color: "#ffffff".to_string(),
            skin: None,
            show_name: true,
            updated_at: 0,
        };
        assert_eq!(rec.session_id(), "user-abc");
    }
}
