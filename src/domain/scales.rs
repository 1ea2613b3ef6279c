// Coordinate spaces and the fixed factors between them.
//
// Local units are thousands of km (on-node physics/rendering), wire units are millions of km
// (replication), and kilometres / astronomical units are the physical reference. Everything
// stays in f64: narrowing before a conversion loses the precision the split exists to keep.

use glam::DVec3;

/// Kilometres represented by one local simulation unit.
pub const KM_PER_LOCAL_UNIT: f64 = 1_000.0;

/// Kilometres represented by one wire unit.
pub const KM_PER_WIRE_UNIT: f64 = 1_000_000.0;

/// Kilometres per astronomical unit.
pub const KM_PER_AU: f64 = 149_597_870.7;

/// Earth's mean diameter in km; the planet table expresses diameters relative to it.
pub const EARTH_DIAMETER_KM: f64 = 12_742.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

// Local -> wire: local * 1e3 km / 1e6 km.
const LOCAL_TO_WIRE: f64 = KM_PER_LOCAL_UNIT / KM_PER_WIRE_UNIT;

pub fn to_wire(local: f64) -> f64 {
    local * LOCAL_TO_WIRE
}

pub fn to_local(wire: f64) -> f64 {
    wire / LOCAL_TO_WIRE
}

pub fn to_wire_vec(local: DVec3) -> DVec3 {
    local * LOCAL_TO_WIRE
}

pub fn to_local_vec(wire: DVec3) -> DVec3 {
    wire / LOCAL_TO_WIRE
}

pub fn km_to_wire(km: f64) -> f64 {
    km / KM_PER_WIRE_UNIT
}

pub fn wire_to_km(wire: f64) -> f64 {
    wire * KM_PER_WIRE_UNIT
}

pub fn km_to_wire_vec(km: DVec3) -> DVec3 {
    km / KM_PER_WIRE_UNIT
}

pub fn wire_to_km_vec(wire: DVec3) -> DVec3 {
    wire * KM_PER_WIRE_UNIT
}

pub fn km_to_local(km: f64) -> f64 {
    km / KM_PER_LOCAL_UNIT
}

pub fn local_to_km(local: f64) -> f64 {
    local * KM_PER_LOCAL_UNIT
}

pub fn au_to_km(au: f64) -> f64 {
    au * KM_PER_AU
}

pub fn km_to_au(km: f64) -> f64 {
    km / KM_PER_AU
}

/// Astronomical units straight to wire units (orbit radii in the snapshot).
pub fn au_to_wire(au: f64) -> f64 {
    km_to_wire(au_to_km(au))
}
