// Simulation configuration passed explicitly to every component that needs scale, time or
// gameplay tuning. Fixed scale factors live in `scales`; everything here is tunable and can be
// overridden from a TOML file.

use glam::{DQuat, DVec3};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShipTuning {
    /// Forward speed at full throttle, local units per second.
    pub movement_speed: f64,

    /// Yaw rate at full steering, radians per second.
    pub turning_speed: f64,
}

impl Default for ShipTuning {
    fn default() -> Self {
        Self {
            movement_speed: 100.0,
            turning_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Spawn position in km.
    pub position_km: [f64; 3],

    /// Yaw around +Y in degrees.
    pub yaw_degrees: f64,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            position_km: [0.0, 0.0, -20_000_000.0],
            yaw_degrees: 0.0,
        }
    }
}

impl SpawnTuning {
    pub fn position_km(&self) -> DVec3 {
        DVec3::from_array(self.position_km)
    }

    pub fn rotation(&self) -> DQuat {
        DQuat::from_rotation_y(self.yaw_degrees.to_radians())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed simulation tick, milliseconds.
    pub tick_interval_ms: u64,

    /// Simulated seconds per real second fed to the orbit model at time scale 1.
    pub time_acceleration: f64,

    /// Rendered distance (local units) past which a client rebases its origin.
    pub floating_origin_threshold: f64,

    /// Multiplier on a body's bounding radius when warping next to it.
    pub warp_clearance: f64,

    pub asteroid_count: usize,
    pub asteroid_seed: u64,

    pub input_channel_capacity: usize,
    pub replication_broadcast_capacity: usize,

    pub ship: ShipTuning,
    pub spawn: SpawnTuning,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000 / 60,
            // Ten simulated days per real second.
            time_acceleration: 864_000.0,
            floating_origin_threshold: 10_000.0,
            warp_clearance: 1.5,
            asteroid_count: 1000,
            asteroid_seed: 0x5EED,
            input_channel_capacity: 1024,
            replication_broadcast_capacity: 128,
            ship: ShipTuning::default(),
            spawn: SpawnTuning::default(),
        }
    }
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
