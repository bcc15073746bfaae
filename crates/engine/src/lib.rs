//! Petri arena simulation engine.
//!
//! Client-authoritative cell-growth simulation: every client runs its
//! own physics, collision and growth rules over its owned cells, and
//! reconciles remote state through a best-effort realtime channel plus
//! a persisted store. There is no server-side authority; the engine is
//! single-threaded and driven one tick per render frame by the host.

pub mod collision;
pub mod config;
pub mod entity;
pub mod game;
pub mod growth;
pub mod input;
pub mod leaderboard;
pub mod physics;
pub mod player;
pub mod sync;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use game::{Game, TickOutcome};
pub use input::InputSnapshot;
pub use player::{LocalPlayer, PlayerStatus};
pub use world::World;
