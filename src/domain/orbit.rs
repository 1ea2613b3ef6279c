// Circular orbit model: position and spin are pure functions of elapsed simulated time, so any
// node evaluating the same inputs gets bit-identical results. Only the node owning the body's
// transform evaluates it; everyone else mirrors the replicated output.

use crate::domain::components::OrbitInfo;
use crate::domain::errors::SimError;
use crate::domain::scales::SECONDS_PER_DAY;
use glam::{DQuat, DVec3};

/// Axial tilt applied to every spinning body, degrees (Earth's tilt to the sun's equator).
pub const AXIAL_TILT_DEGREES: f64 = 7.155;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitSample {
    /// Wire units, same scale as `OrbitInfo::orbit_radius`.
    pub position: DVec3,
    pub rotation: DQuat,
    /// Orbital angle in [0, 360).
    pub angle_degrees: f64,
    /// Spin angle in [0, 360).
    pub spin_degrees: f64,
}

pub fn validate(orbit: &OrbitInfo) -> Result<(), SimError> {
    let fields = [
        ("initial_angle", orbit.initial_angle),
        ("orbit_radius", orbit.orbit_radius),
        ("orbit_period", orbit.orbit_period),
        ("rotation_period", orbit.rotation_period),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(SimError::InvalidOrbitParameters {
            reason: format!("{name} is not finite"),
        });
    }
    if orbit.orbit_period <= 0.0 {
        return Err(SimError::InvalidOrbitParameters {
            reason: format!("orbit_period must be positive, got {}", orbit.orbit_period),
        });
    }
    if orbit.rotation_period <= 0.0 {
        return Err(SimError::InvalidOrbitParameters {
            reason: format!(
                "rotation_period must be positive, got {}",
                orbit.rotation_period
            ),
        });
    }
    if orbit.orbit_radius < 0.0 {
        return Err(SimError::InvalidOrbitParameters {
            reason: format!("orbit_radius must not be negative, got {}", orbit.orbit_radius),
        });
    }
    Ok(())
}

// Fraction of a full turn covered after `elapsed` seconds of a `period_seconds` cycle, in degrees.
fn cycle_degrees(elapsed: f64, period_seconds: f64) -> f64 {
    elapsed.rem_euclid(period_seconds) * 360.0 / period_seconds
}

pub fn compute_transform(orbit: &OrbitInfo, elapsed_seconds: f64) -> Result<OrbitSample, SimError> {
    validate(orbit)?;

    let orbit_period = orbit.orbit_period * SECONDS_PER_DAY;
    let angle_degrees =
        (orbit.initial_angle + cycle_degrees(elapsed_seconds, orbit_period)).rem_euclid(360.0);
    let angle = angle_degrees.to_radians();
    let position = DVec3::new(
        orbit.orbit_radius * angle.cos(),
        0.0,
        orbit.orbit_radius * angle.sin(),
    );

    let rotation_period = orbit.rotation_period * SECONDS_PER_DAY;
    let spin_degrees = cycle_degrees(elapsed_seconds, rotation_period).rem_euclid(360.0);
    let rotation = DQuat::from_rotation_z(AXIAL_TILT_DEGREES.to_radians())
        * DQuat::from_rotation_y(spin_degrees.to_radians());

    Ok(OrbitSample {
        position,
        rotation,
        angle_degrees,
        spin_degrees,
    })
}
