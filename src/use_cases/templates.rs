// Component sets for every entity kind the world knows how to create. All spatial values are
// wire units; orbiting bodies start at their t = 0 orbit sample.

use crate::domain::orbit::{self, compute_transform};
use crate::domain::planets::planet_data;
use crate::domain::scales::{SECONDS_PER_DAY, au_to_wire, km_to_wire, km_to_wire_vec};
use crate::domain::tuning::SpawnTuning;
use crate::domain::{
    ComponentValue, EntityType, OrbitInfo, Position, ShipControls, SimError, TransformInfo,
};
use glam::DVec3;

const DAYS_PER_YEAR: f64 = 365.25;

// One spin per simulated minute.
const ASTEROID_ROTATION_DAYS: f64 = 1.0 / (24.0 * 60.0);

pub fn player_creator() -> Vec<ComponentValue> {
    vec![
        ComponentValue::EntityType(EntityType::PlayerCreator),
        ComponentValue::Position(Position {
            coords: DVec3::ZERO,
        }),
    ]
}

pub fn planet(index: u32) -> Result<Vec<ComponentValue>, SimError> {
    let data = planet_data(index).ok_or_else(|| SimError::InvalidOrbitParameters {
        reason: format!("unknown planet index {index}"),
    })?;

    let orbit = OrbitInfo {
        initial_angle: data.y.atan2(data.x).to_degrees().rem_euclid(360.0),
        orbit_radius: au_to_wire(data.distance_from_sun()),
        orbit_period: data.orbital_period * DAYS_PER_YEAR,
        // Retrograde spin is not modelled; the period alone drives the rotation.
        rotation_period: data.rotation_period.abs(),
    };
    let scale = DVec3::splat(km_to_wire(data.diameter_km()));

    let mut components = orbiting_body(orbit, scale)?;
    components.push(ComponentValue::EntityType(EntityType::Planet));
    components.push(ComponentValue::PlanetIndex(index));
    Ok(components)
}

/// `orbit_radius_au` is heliocentric; the period follows Kepler's third law from it.
pub fn asteroid(
    initial_angle: f64,
    orbit_radius_au: f64,
    diameter_km: f64,
) -> Result<Vec<ComponentValue>, SimError> {
    let orbit = OrbitInfo {
        initial_angle,
        orbit_radius: au_to_wire(orbit_radius_au),
        orbit_period: DAYS_PER_YEAR * orbit_radius_au.powf(1.5),
        rotation_period: ASTEROID_ROTATION_DAYS,
    };
    let scale = DVec3::splat(km_to_wire(diameter_km));

    let mut components = orbiting_body(orbit, scale)?;
    components.push(ComponentValue::EntityType(EntityType::Asteroid));
    Ok(components)
}

pub fn player_ship(spawn: &SpawnTuning) -> Vec<ComponentValue> {
    let transform = TransformInfo {
        position: km_to_wire_vec(spawn.position_km()),
        rotation: spawn.rotation(),
        scale: DVec3::ONE,
    };
    vec![
        ComponentValue::EntityType(EntityType::PlayerShip),
        ComponentValue::Position(Position {
            coords: transform.position,
        }),
        ComponentValue::TransformInfo(transform),
        ComponentValue::ShipControls(ShipControls::default()),
    ]
}

fn orbiting_body(orbit: OrbitInfo, scale: DVec3) -> Result<Vec<ComponentValue>, SimError> {
    orbit::validate(&orbit)?;
    let start = compute_transform(&orbit, 0.0)?;

    Ok(vec![
        ComponentValue::Position(Position {
            coords: start.position,
        }),
        ComponentValue::TransformInfo(TransformInfo {
            position: start.position,
            rotation: start.rotation,
            scale,
        }),
        ComponentValue::OrbitInfo(orbit),
    ])
}

/// Looks up the orbit carried in a component set, if any.
pub fn orbit_of(components: &[ComponentValue]) -> Option<&OrbitInfo> {
    components.iter().find_map(|c| match c {
        ComponentValue::OrbitInfo(orbit) => Some(orbit),
        _ => None,
    })
}

/// Simulated seconds for one full revolution.
pub fn orbit_seconds(orbit: &OrbitInfo) -> f64 {
    orbit.orbit_period * SECONDS_PER_DAY
}
