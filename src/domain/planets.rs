// Static descriptive table for the nine bodies spawned at world bootstrap.
//
// Heliocentric coordinates are in AU with the reference plane on Earth's orbit, sampled at
// 2018-01-01 00:00:00. Mass, diameter and periods are relative to Earth.

use crate::domain::scales::EARTH_DIAMETER_KM;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetData {
    pub name: &'static str,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub mass: f64,
    pub diameter: f64,
    /// Negative for retrograde rotation.
    pub rotation_period: f64,
    /// Years.
    pub orbital_period: f64,
}

impl PlanetData {
    /// Distance from the sun projected on the reference plane, in AU.
    pub fn distance_from_sun(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn diameter_km(&self) -> f64 {
        self.diameter * EARTH_DIAMETER_KM
    }
}

pub const PLANET_COUNT: u32 = 9;

const PLANETS: [PlanetData; PLANET_COUNT as usize] = [
    PlanetData {
        name: "Mercury",
        x: -0.3890948,
        y: -0.0173439,
        z: 0.0344211,
        mass: 0.0553,
        diameter: 0.383,
        rotation_period: 58.8,
        orbital_period: 0.241,
    },
    PlanetData {
        name: "Venus",
        x: 0.0801084,
        y: -0.7227354,
        z: -0.0143865,
        mass: 0.815,
        diameter: 0.949,
        rotation_period: -244.0,
        orbital_period: 0.615,
    },
    PlanetData {
        name: "Earth",
        x: -0.1844608,
        y: 0.9658580,
        z: 0.0,
        mass: 1.0,
        diameter: 1.0,
        rotation_period: 1.0,
        orbital_period: 1.0,
    },
    PlanetData {
        name: "Mars",
        x: -1.5808145,
        y: -0.3995236,
        z: 0.0305856,
        mass: 0.107,
        diameter: 0.532,
        rotation_period: 1.025957,
        orbital_period: 1.88,
    },
    PlanetData {
        name: "Jupiter",
        x: -4.2561706,
        y: -3.3723786,
        z: 0.1093285,
        mass: 317.8,
        diameter: 11.21,
        rotation_period: 0.415,
        orbital_period: 11.9,
    },
    PlanetData {
        name: "Saturn",
        x: 0.0898178,
        y: -10.0823233,
        z: 0.1718396,
        mass: 95.2,
        diameter: 9.45,
        rotation_period: 0.445,
        orbital_period: 29.4,
    },
    PlanetData {
        name: "Uranus",
        x: 17.7211786,
        y: 9.0654912,
        z: -0.1960038,
        mass: 14.5,
        diameter: 4.01,
        rotation_period: -0.720,
        orbital_period: 83.7,
    },
    PlanetData {
        name: "Neptune",
        x: 28.7078888,
        y: -8.4582224,
        z: -0.4842037,
        mass: 17.1,
        diameter: 3.88,
        rotation_period: 0.673,
        orbital_period: 163.7,
    },
    PlanetData {
        name: "Pluto",
        x: 10.8929283,
        y: -31.5782334,
        z: 0.2721556,
        mass: 0.0025,
        diameter: 0.186,
        rotation_period: 6.41,
        orbital_period: 247.9,
    },
];

pub fn planet_data(index: u32) -> Option<&'static PlanetData> {
    PLANETS.get(index as usize)
}

pub fn planet_name(index: u32) -> &'static str {
    planet_data(index).map_or("unknown", |p| p.name)
}
