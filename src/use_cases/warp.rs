// Warp-to-body flow: the query runs on its own task and reports back through a channel that
// the simulation drains at the start of a later tick. Responses are sequence-stamped per ship
// and anything older than the ship's latest request is dropped.

use crate::domain::scales::to_local_vec;
use crate::domain::{ComponentKind, ComponentValue, EntityId, EntityQuery, QueryHit, SimError};
use crate::use_cases::store::SpatialStore;
use glam::DVec3;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct WarpResolution {
    pub ship: EntityId,
    pub sequence: u64,
    pub target_index: u32,
    pub result: Result<Vec<QueryHit>, String>,
}

pub struct WarpCoordinator {
    query: Arc<dyn EntityQuery>,
    results_tx: mpsc::UnboundedSender<WarpResolution>,
    results_rx: mpsc::UnboundedReceiver<WarpResolution>,
    latest: HashMap<EntityId, u64>,
}

impl WarpCoordinator {
    pub fn new(query: Arc<dyn EntityQuery>) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            query,
            results_tx,
            results_rx,
            latest: HashMap::new(),
        }
    }

    /// Marks `sequence` as the ship's newest command; older in-flight queries become stale.
    pub fn supersede(&mut self, ship: EntityId, sequence: u64) {
        let latest = self.latest.entry(ship).or_insert(sequence);
        *latest = (*latest).max(sequence);
    }

    /// Starts the body query without waiting for it. Must run inside a tokio runtime.
    pub fn request(&mut self, ship: EntityId, sequence: u64, target_index: u32) {
        self.supersede(ship, sequence);

        let query = self.query.clone();
        let results_tx = self.results_tx.clone();
        tokio::spawn(async move {
            let result = query.entities_with(ComponentKind::PlanetIndex).await;
            // The coordinator may be gone by now; nothing to report to.
            let _ = results_tx.send(WarpResolution {
                ship,
                sequence,
                target_index,
                result,
            });
        });
        debug!(%ship, sequence, target_index, "warp query issued");
    }

    pub fn forget(&mut self, ship: EntityId) {
        self.latest.remove(&ship);
    }

    /// Responses that arrived since the last call and are still current.
    pub fn drain_ready(&mut self) -> Vec<WarpResolution> {
        let mut ready = Vec::new();
        while let Ok(resolution) = self.results_rx.try_recv() {
            match self.latest.get(&resolution.ship) {
                Some(&latest) if latest == resolution.sequence => ready.push(resolution),
                Some(&latest) => info!(
                    ship = %resolution.ship,
                    sequence = resolution.sequence,
                    latest,
                    "discarding stale warp response"
                ),
                None => debug!(ship = %resolution.ship, "warp response for unknown ship dropped"),
            }
        }
        ready
    }
}

/// Picks the target body out of the query result and returns the arrival position in local
/// units, just outside the body's bounding radius on its sun-facing side.
pub fn resolve_destination(
    resolution: &WarpResolution,
    store: &SpatialStore,
    clearance: f64,
) -> Result<DVec3, SimError> {
    let hits = resolution
        .result
        .as_ref()
        .map_err(|reason| SimError::QueryFailed {
            reason: reason.clone(),
        })?;

    let body = hits
        .iter()
        .find(|hit| hit.value == ComponentValue::PlanetIndex(resolution.target_index))
        .ok_or_else(|| SimError::QueryFailed {
            reason: format!("no body with index {}", resolution.target_index),
        })?;

    let transform = store
        .transform(body.entity)
        .ok_or_else(|| SimError::QueryFailed {
            reason: format!("no transform known for body {}", body.entity),
        })?;

    let bounding_radius = transform.scale.max_element() / 2.0;
    let mut direction = (-transform.position).normalize_or_zero();
    if direction == DVec3::ZERO {
        direction = DVec3::X;
    }
    let arrival = transform.position + direction * bounding_radius * clearance;
    Ok(to_local_vec(arrival))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransformInfo;
    use crate::use_cases::test_support::{FixedAuthority, StaticQuery};
    use approx::assert_relative_eq;
    use glam::DQuat;
    use std::time::Duration;

    const SHIP: EntityId = EntityId(100);
    const EARTH: EntityId = EntityId(3);

    fn store_with_earth() -> SpatialStore {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::none()));
        store.seed(EARTH, ComponentValue::PlanetIndex(2));
        store.seed(
            EARTH,
            ComponentValue::TransformInfo(TransformInfo {
                position: DVec3::new(100.0, 0.0, 0.0),
                rotation: DQuat::IDENTITY,
                scale: DVec3::splat(0.02),
            }),
        );
        store
    }

    fn resolution(target_index: u32, result: Result<Vec<QueryHit>, String>) -> WarpResolution {
        WarpResolution {
            ship: SHIP,
            sequence: 1,
            target_index,
            result,
        }
    }

    async fn wait_for(coordinator: &mut WarpCoordinator) -> Vec<WarpResolution> {
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let ready = coordinator.drain_ready();
            if !ready.is_empty() {
                return ready;
            }
        }
        Vec::new()
    }

    #[test]
    fn when_body_matches_then_arrival_is_outside_its_radius_toward_the_sun() {
        let store = store_with_earth();
        let hits = vec![QueryHit {
            entity: EARTH,
            value: ComponentValue::PlanetIndex(2),
        }];

        let arrival = resolve_destination(&resolution(2, Ok(hits)), &store, 1.5)
            .expect("earth is known");

        // 100 wire units minus 1.5 * 0.01 wire units, in local units.
        assert_relative_eq!(arrival.x, (100.0 - 0.015) * 1_000.0, max_relative = 1e-12);
        assert_relative_eq!(arrival.y, 0.0);
    }

    #[test]
    fn when_no_body_matches_then_query_failed() {
        let store = store_with_earth();
        let hits = vec![QueryHit {
            entity: EARTH,
            value: ComponentValue::PlanetIndex(2),
        }];

        let result = resolve_destination(&resolution(7, Ok(hits)), &store, 1.5);

        assert!(matches!(result, Err(SimError::QueryFailed { .. })));
    }

    #[test]
    fn when_query_errors_then_query_failed_carries_the_reason() {
        let store = store_with_earth();

        let result = resolve_destination(&resolution(2, Err("timeout".into())), &store, 1.5);

        assert_eq!(
            result,
            Err(SimError::QueryFailed {
                reason: "timeout".into()
            })
        );
    }

    #[tokio::test]
    async fn when_query_completes_then_resolution_is_drained_later() {
        let query = Arc::new(StaticQuery::hits(vec![QueryHit {
            entity: EARTH,
            value: ComponentValue::PlanetIndex(2),
        }]));
        let mut coordinator = WarpCoordinator::new(query);

        coordinator.request(SHIP, 1, 2);
        let ready = wait_for(&mut coordinator).await;

        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].sequence, 1);
        assert!(ready[0].result.is_ok());
    }

    #[tokio::test]
    async fn when_a_newer_command_supersedes_then_old_response_is_discarded() {
        let query = Arc::new(StaticQuery::hits(Vec::new()).delayed(Duration::from_millis(20)));
        let mut coordinator = WarpCoordinator::new(query);

        coordinator.request(SHIP, 1, 2);
        coordinator.supersede(SHIP, 2);
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(coordinator.drain_ready().is_empty());
    }
}
