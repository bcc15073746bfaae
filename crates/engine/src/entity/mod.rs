//! Entity types: owned cells, remote cells, pixels.
//!
//! Pure data plus shape-level helpers; rule correctness lives in the
//! collision/growth/sync modules that mutate these.

pub mod cell;
pub mod pixel;
pub mod remote;

pub use cell::{mass_to_radius, MergePhase, OwnedCell};
pub use pixel::Pixel;
pub use remote::RemoteCell;
