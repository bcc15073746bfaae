//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub virus: VirusConfig,
    #[serde(default)]
    pub eject: EjectConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from `petri.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("petri.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No petri.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            player: PlayerConfig::default(),
            food: FoodConfig::default(),
            virus: VirusConfig::default(),
            eject: EjectConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// World bounds configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Half extent of the square world; positions are clamped into
    /// `[-half_extent, half_extent]` on both axes.
    #[serde(default = "default_half_extent")]
    pub half_extent: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            half_extent: default_half_extent(),
        }
    }
}

fn default_half_extent() -> f32 {
    2000.0
}

/// Player cell configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Mass a cell spawns and respawns with.
    #[serde(default = "default_start_mass")]
    pub start_mass: f32,
    /// Maximum owned cells at any time.
    #[serde(default = "default_max_cells")]
    pub max_cells: usize,
    /// Minimum mass required to split.
    #[serde(default = "default_min_split_mass")]
    pub min_split_mass: f32,
    /// Outward impulse given to a freshly split sibling, units/s.
    #[serde(default = "default_split_impulse")]
    pub split_impulse: f32,
    /// Cooldown after creation/split before two siblings may merge.
    #[serde(default = "default_merge_cooldown_ms")]
    pub merge_cooldown_ms: f64,
    /// Base steering speed at start mass, units/s.
    #[serde(default = "default_speed")]
    pub speed: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_mass: default_start_mass(),
            max_cells: default_max_cells(),
            min_split_mass: default_min_split_mass(),
            split_impulse: default_split_impulse(),
            merge_cooldown_ms: default_merge_cooldown_ms(),
            speed: default_speed(),
        }
    }
}

fn default_start_mass() -> f32 {
    10.0
}
fn default_max_cells() -> usize {
    16
}
fn default_min_split_mass() -> f32 {
    36.0
}
fn default_split_impulse() -> f32 {
    750.0
}
fn default_merge_cooldown_ms() -> f64 {
    15_000.0
}
fn default_speed() -> f32 {
    150.0
}

/// Food pixel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Mass gained from eating one plain food pixel.
    #[serde(default = "default_food_mass_gain")]
    pub mass_gain: f32,
    /// Drawn/collision radius of a food pixel.
    #[serde(default = "default_food_radius")]
    pub radius: f32,
    /// Global pixel population below which this client seeds food.
    #[serde(default = "default_max_pixels")]
    pub max_pixels: usize,
    /// Per-tick probability of seeding one food pixel.
    #[serde(default = "default_spawn_chance")]
    pub spawn_chance: f64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            mass_gain: default_food_mass_gain(),
            radius: default_food_radius(),
            max_pixels: default_max_pixels(),
            spawn_chance: default_spawn_chance(),
        }
    }
}

fn default_food_mass_gain() -> f32 {
    1.0
}
fn default_food_radius() -> f32 {
    6.0
}
fn default_max_pixels() -> usize {
    100
}
fn default_spawn_chance() -> f64 {
    0.05
}

/// Virus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusConfig {
    /// Fixed virus radius, larger than food.
    #[serde(default = "default_virus_radius")]
    pub radius: f32,
    /// Number of children a virus pop splits a cell into.
    #[serde(default = "default_virus_split_count")]
    pub split_count: usize,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            radius: default_virus_radius(),
            split_count: default_virus_split_count(),
        }
    }
}

fn default_virus_radius() -> f32 {
    35.0
}
fn default_virus_split_count() -> usize {
    8
}

/// Ejected mass configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EjectConfig {
    /// Minimum cell mass required to eject.
    #[serde(default = "default_min_eject_mass")]
    pub min_mass: f32,
    /// Mass subtracted from the ejecting cell.
    #[serde(default = "default_eject_cost")]
    pub cost: f32,
    /// Mass granted to whoever eats the ejected pixel.
    #[serde(default = "default_eject_gain")]
    pub gain: f32,
    /// Outward impulse of the ejected pixel, units/s.
    #[serde(default = "default_eject_impulse")]
    pub impulse: f32,
    /// While the pixel moves faster than this, its owner cannot
    /// re-consume it.
    #[serde(default = "default_immunity_speed")]
    pub immunity_speed: f32,
}

impl Default for EjectConfig {
    fn default() -> Self {
        Self {
            min_mass: default_min_eject_mass(),
            cost: default_eject_cost(),
            gain: default_eject_gain(),
            impulse: default_eject_impulse(),
            immunity_speed: default_immunity_speed(),
        }
    }
}

fn default_min_eject_mass() -> f32 {
    32.0
}
fn default_eject_cost() -> f32 {
    10.0
}
fn default_eject_gain() -> f32 {
    8.0
}
fn default_eject_impulse() -> f32 {
    600.0
}
fn default_immunity_speed() -> f32 {
    30.0
}

/// Network reconciliation timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Interval between positional broadcasts, milliseconds.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: f64,
    /// Interval between durable cell upserts, milliseconds.
    #[serde(default = "default_persist_interval_ms")]
    pub persist_interval_ms: f64,
    /// Silence after which a remote entity is presumed gone.
    #[serde(default = "default_staleness_ms")]
    pub staleness_ms: f64,
    /// Interval between garbage-collection sweeps.
    #[serde(default = "default_gc_interval_ms")]
    pub gc_interval_ms: f64,
    /// Minimum interval between leaderboard recomputes.
    #[serde(default = "default_leaderboard_interval_ms")]
    pub leaderboard_interval_ms: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: default_broadcast_interval_ms(),
            persist_interval_ms: default_persist_interval_ms(),
            staleness_ms: default_staleness_ms(),
            gc_interval_ms: default_gc_interval_ms(),
            leaderboard_interval_ms: default_leaderboard_interval_ms(),
        }
    }
}

fn default_broadcast_interval_ms() -> f64 {
    50.0
}
fn default_persist_interval_ms() -> f64 {
    2000.0
}
fn default_staleness_ms() -> f64 {
    5000.0
}
fn default_gc_interval_ms() -> f64 {
    5000.0
}
fn default_leaderboard_interval_ms() -> f64 {
    250.0
}
