//! Engine configuration.
//!
//! [`EngineConfig`] gathers every gameplay constant the temporal controller
//! and the reference collaborators read. It deserializes from JSON with
//! per-field defaults, so a level pack only needs to list what it changes.

use serde::{Deserialize, Serialize};

/// Tunables for the temporal controller and the standard collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Edge length of a square tile, in pixels.
    pub tile_size: f64,
    pub player_radius: f64,
    pub bullet_radius: f64,
    pub exit_radius: f64,
    /// Pixels per tick.
    pub player_speed: f64,
    /// Pixels per tick.
    pub bullet_speed: f64,
    /// Ticks between two shots.
    pub fire_cooldown: u32,
    pub interact_radius: f64,
    /// Spikes stay lowered for one period, then raised for one period.
    pub spike_period: u64,
    pub view_radius: f64,
    /// Full opening angle of a player's view cone, in radians.
    pub field_of_view: f64,
}

impl Default for EngineConfig {
    /// 60 Hz with 32-pixel tiles.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            tile_size: 32.0,
            player_radius: 10.0,
            bullet_radius: 3.0,
            exit_radius: 12.0,
            player_speed: 2.0,
            bullet_speed: 8.0,
            fire_cooldown: 20,
            interact_radius: 24.0,
            spike_period: 60,
            view_radius: 256.0,
            field_of_view: std::f64::consts::FRAC_PI_2 * 1.5,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON object; missing fields take their default.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
