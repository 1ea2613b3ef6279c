// World bootstrap: a default snapshot generator plus JSON persistence.

use super::templates;
use crate::domain::orbit;
use crate::domain::planets::PLANET_COUNT;
use crate::domain::{ComponentValue, EntityId, SimError, SimulationConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const BELT_INNER_AU: f64 = 2.0;
const BELT_OUTER_AU: f64 = 3.2;
const ASTEROID_MIN_DIAMETER_KM: f64 = 10_000.0;
const ASTEROID_MAX_DIAMETER_KM: f64 = 60_000.0;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("default world: {0}")]
    Generate(#[from] SimError),

    #[error("entity {entity} in snapshot: {source}")]
    Invalid {
        entity: EntityId,
        #[source]
        source: SimError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntity {
    pub id: EntityId,
    pub components: Vec<ComponentValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub entities: Vec<SnapshotEntity>,
}

impl WorldSnapshot {
    /// First id not used by any entity in the snapshot.
    pub fn next_free_id(&self) -> EntityId {
        EntityId(self.entities.iter().map(|e| e.id.0).max().map_or(1, |max| max + 1))
    }

    /// Rejects any entity whose orbit the model could not evaluate.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        for entity in &self.entities {
            if let Some(orbit) = templates::orbit_of(&entity.components) {
                orbit::validate(orbit).map_err(|source| SnapshotError::Invalid {
                    entity: entity.id,
                    source,
                })?;
            }
        }
        Ok(())
    }
}

/// One player creator, the nine planets and a seeded asteroid belt, ids from 1 upward.
pub fn generate_default_snapshot(config: &SimulationConfig) -> Result<WorldSnapshot, SimError> {
    let mut rng = StdRng::seed_from_u64(config.asteroid_seed);
    let mut entities = Vec::with_capacity(1 + PLANET_COUNT as usize + config.asteroid_count);
    let mut next_id = 1u64;
    let mut push = |components: Vec<ComponentValue>| {
        entities.push(SnapshotEntity {
            id: EntityId(next_id),
            components,
        });
        next_id += 1;
    };

    push(templates::player_creator());
    for index in 0..PLANET_COUNT {
        push(templates::planet(index)?);
    }
    for _ in 0..config.asteroid_count {
        let angle = rng.gen_range(-180.0..180.0);
        let radius_au = rng.gen_range(BELT_INNER_AU..BELT_OUTER_AU);
        let diameter_km = rng.gen_range(ASTEROID_MIN_DIAMETER_KM..ASTEROID_MAX_DIAMETER_KM);
        push(templates::asteroid(angle, radius_au, diameter_km)?);
    }

    Ok(WorldSnapshot { entities })
}

pub fn save_snapshot(path: &Path, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(snapshot)?;
    fs::write(path, json)?;
    info!(path = %path.display(), entities = snapshot.entities.len(), "snapshot saved");
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<WorldSnapshot, SnapshotError> {
    let json = fs::read_to_string(path)?;
    let snapshot: WorldSnapshot = serde_json::from_str(&json)?;
    snapshot.validate()?;
    info!(path = %path.display(), entities = snapshot.entities.len(), "snapshot loaded");
    Ok(snapshot)
}

/// Loads the snapshot at `path`, generating and saving the default one first if it is missing.
pub fn load_or_generate(
    path: &Path,
    config: &SimulationConfig,
) -> Result<WorldSnapshot, SnapshotError> {
    if !path.exists() {
        info!(path = %path.display(), "no snapshot found, generating default world");
        let snapshot = generate_default_snapshot(config)?;
        save_snapshot(path, &snapshot)?;
    }
    load_snapshot(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scales::{KM_PER_AU, wire_to_km};
    use crate::domain::{EntityType, OrbitInfo};
    use std::path::PathBuf;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            asteroid_count: 25,
            ..SimulationConfig::default()
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("orrery-{}-{name}", std::process::id()))
            .join("world.json")
    }

    fn count_type(snapshot: &WorldSnapshot, wanted: EntityType) -> usize {
        snapshot
            .entities
            .iter()
            .filter(|e| {
                e.components
                    .contains(&ComponentValue::EntityType(wanted))
            })
            .count()
    }

    #[test]
    fn when_default_world_is_generated_then_it_has_creator_planets_and_belt() {
        let snapshot = generate_default_snapshot(&small_config()).expect("valid templates");

        assert_eq!(snapshot.entities.len(), 1 + 9 + 25);
        assert_eq!(count_type(&snapshot, EntityType::PlayerCreator), 1);
        assert_eq!(count_type(&snapshot, EntityType::Planet), 9);
        assert_eq!(count_type(&snapshot, EntityType::Asteroid), 25);
        assert_eq!(snapshot.next_free_id(), EntityId(36));

        for entity in &snapshot.entities {
            if entity
                .components
                .contains(&ComponentValue::EntityType(EntityType::Asteroid))
            {
                let orbit = templates::orbit_of(&entity.components).expect("asteroids orbit");
                let au = wire_to_km(orbit.orbit_radius) / KM_PER_AU;
                assert!((BELT_INNER_AU..BELT_OUTER_AU).contains(&au));
            }
        }
    }

    #[test]
    fn when_seed_is_fixed_then_generation_is_reproducible() {
        let a = generate_default_snapshot(&small_config()).expect("valid");
        let b = generate_default_snapshot(&small_config()).expect("valid");

        assert_eq!(a, b);
    }

    #[test]
    fn when_snapshot_is_missing_then_it_is_generated_saved_and_loaded() {
        let path = temp_path("fresh");
        let _ = fs::remove_file(&path);

        let loaded = load_or_generate(&path, &small_config()).expect("generated");

        assert!(path.exists());
        let generated = generate_default_snapshot(&small_config()).expect("valid");
        let ids = |s: &WorldSnapshot| s.entities.iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(&loaded), ids(&generated));
        assert_eq!(count_type(&loaded, EntityType::Planet), 9);
        let _ = fs::remove_dir_all(path.parent().expect("has parent"));
    }

    #[test]
    fn when_snapshot_holds_a_bad_orbit_then_loading_fails() {
        let path = temp_path("bad-orbit");
        let snapshot = WorldSnapshot {
            entities: vec![SnapshotEntity {
                id: EntityId(4),
                components: vec![ComponentValue::OrbitInfo(OrbitInfo {
                    initial_angle: 0.0,
                    orbit_radius: 1.0,
                    orbit_period: 0.0,
                    rotation_period: 1.0,
                })],
            }],
        };
        save_snapshot(&path, &snapshot).expect("written");

        let result = load_snapshot(&path);

        assert!(matches!(
            result,
            Err(SnapshotError::Invalid {
                entity: EntityId(4),
                source: SimError::InvalidOrbitParameters { .. }
            })
        ));
        let _ = fs::remove_dir_all(path.parent().expect("has parent"));
    }
}
