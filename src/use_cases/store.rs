// Per-node component store with the authority-gated write contract.
//
// Writes go through the injected authority check and leave a coalesced delta behind; remote
// deltas only touch the fields they carry. `flush` drains at most one message per
// (entity, component) per tick.

use crate::domain::{
    AuthorityAssignment, ComponentDelta, ComponentKind, ComponentValue, EntityId, OrbitInfo,
    ReplicationMessage, ShipControls, SimError, TransformInfo,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of applying a replicated delta to the local mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied,
    /// The mirror had never seen this component; present fields were applied over defaults.
    Partial(SimError),
    /// This node owns the component, so the remote value was dropped.
    IgnoredAuthoritative,
}

pub struct SpatialStore {
    authority: Arc<dyn AuthorityAssignment>,
    entities: BTreeMap<EntityId, BTreeMap<ComponentKind, ComponentValue>>,
    pending: BTreeMap<(EntityId, ComponentKind), ComponentDelta>,
}

impl SpatialStore {
    pub fn new(authority: Arc<dyn AuthorityAssignment>) -> Self {
        Self {
            authority,
            entities: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn has_authority(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.authority.has_authority(entity, kind)
    }

    /// Installs a value without an authority check or replication (world bootstrap).
    pub fn seed(&mut self, entity: EntityId, value: ComponentValue) {
        self.entities
            .entry(entity)
            .or_default()
            .insert(value.kind(), value);
    }

    /// Installs a component of a newly created entity and queues it in full so readers that
    /// are already connected learn about the entity on the next flush.
    pub fn insert(&mut self, entity: EntityId, value: ComponentValue) {
        let kind = value.kind();
        self.entities.entry(entity).or_default().insert(kind, value);
        self.pending.insert((entity, kind), ComponentDelta::full(value));
    }

    pub fn write(&mut self, entity: EntityId, value: ComponentValue) -> Result<(), SimError> {
        let kind = value.kind();
        if !self.authority.has_authority(entity, kind) {
            warn!(%entity, %kind, "write rejected: not authoritative");
            return Err(SimError::NotAuthoritative { entity, kind });
        }

        let components = self.entities.entry(entity).or_default();
        let Some(delta) = value.diff(components.get(&kind)) else {
            return Ok(());
        };
        components.insert(kind, value);

        self.pending
            .entry((entity, kind))
            .and_modify(|pending| pending.merge(&delta))
            .or_insert(delta);
        Ok(())
    }

    pub fn apply_remote_update(&mut self, message: &ReplicationMessage) -> ApplyOutcome {
        let entity = message.entity;
        let kind = message.delta.kind();
        if self.authority.has_authority(entity, kind) {
            debug!(%entity, %kind, "remote update ignored: local node is authoritative");
            return ApplyOutcome::IgnoredAuthoritative;
        }

        let components = self.entities.entry(entity).or_default();
        match components.get_mut(&kind) {
            Some(existing) => {
                message.delta.apply_to(existing);
                ApplyOutcome::Applied
            }
            None => {
                components.insert(kind, message.delta.to_value());
                if message.delta.is_complete() {
                    ApplyOutcome::Applied
                } else {
                    let err = SimError::StaleReplicationUpdate { entity, kind };
                    warn!(%entity, %kind, error = %err, "applied partial update over defaults");
                    ApplyOutcome::Partial(err)
                }
            }
        }
    }

    /// Most recently known value: local if authoritative, last mirrored otherwise.
    pub fn read(&self, entity: EntityId, kind: ComponentKind) -> Option<&ComponentValue> {
        self.entities.get(&entity).and_then(|c| c.get(&kind))
    }

    pub fn transform(&self, entity: EntityId) -> Option<TransformInfo> {
        match self.read(entity, ComponentKind::TransformInfo) {
            Some(ComponentValue::TransformInfo(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn controls(&self, entity: EntityId) -> Option<ShipControls> {
        match self.read(entity, ComponentKind::ShipControls) {
            Some(ComponentValue::ShipControls(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn orbit(&self, entity: EntityId) -> Option<OrbitInfo> {
        match self.read(entity, ComponentKind::OrbitInfo) {
            Some(ComponentValue::OrbitInfo(o)) => Some(*o),
            _ => None,
        }
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities_with(&self, kind: ComponentKind) -> Vec<(EntityId, ComponentValue)> {
        self.entities
            .iter()
            .filter_map(|(id, c)| c.get(&kind).map(|v| (*id, *v)))
            .collect()
    }

    /// Forgets an entity and any unsent deltas for it.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        self.pending.retain(|(id, _), _| *id != entity);
        self.entities.remove(&entity).is_some()
    }

    /// Drains this tick's coalesced outbound deltas in a stable order.
    pub fn flush(&mut self) -> Vec<ReplicationMessage> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|((entity, _), delta)| ReplicationMessage { entity, delta })
            .collect()
    }

    /// Every known component as a full delta, for bringing a new reader up to date.
    pub fn full_state(&self) -> Vec<ReplicationMessage> {
        self.entities
            .iter()
            .flat_map(|(entity, components)| {
                components.values().map(|value| ReplicationMessage {
                    entity: *entity,
                    delta: ComponentDelta::full(*value),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Position, TransformDelta};
    use crate::use_cases::test_support::FixedAuthority;
    use glam::{DQuat, DVec3};

    const SHIP: EntityId = EntityId(1);

    fn transform(x: f64) -> TransformInfo {
        TransformInfo {
            position: DVec3::new(x, 0.0, 0.0),
            rotation: DQuat::IDENTITY,
            scale: DVec3::splat(2.0),
        }
    }

    #[test]
    fn when_node_lacks_authority_then_write_is_rejected_and_nothing_is_scheduled() {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::none()));

        let result = store.write(SHIP, ComponentValue::TransformInfo(transform(1.0)));

        assert!(matches!(
            result,
            Err(SimError::NotAuthoritative {
                entity: SHIP,
                kind: ComponentKind::TransformInfo
            })
        ));
        assert!(store.read(SHIP, ComponentKind::TransformInfo).is_none());
        assert!(store.flush().is_empty());
    }

    #[test]
    fn when_written_twice_in_one_tick_then_one_message_carries_latest_value() {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::all()));
        store.seed(SHIP, ComponentValue::TransformInfo(transform(0.0)));

        store
            .write(SHIP, ComponentValue::TransformInfo(transform(1.0)))
            .expect("authoritative");
        let mut rotated = transform(2.0);
        rotated.rotation = DQuat::from_rotation_y(0.5);
        store
            .write(SHIP, ComponentValue::TransformInfo(rotated))
            .expect("authoritative");

        let messages = store.flush();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].delta,
            ComponentDelta::TransformInfo(TransformDelta {
                position: Some(DVec3::new(2.0, 0.0, 0.0)),
                rotation: Some(rotated.rotation),
                scale: None,
            })
        );
        assert!(store.flush().is_empty());
    }

    #[test]
    fn when_entity_is_inserted_then_every_component_is_queued_in_full() {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::none()));

        store.insert(SHIP, ComponentValue::TransformInfo(transform(4.0)));
        store.insert(SHIP, ComponentValue::PlanetIndex(7));

        let messages = store.flush();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.entity == SHIP && m.delta.is_complete()));
        assert_eq!(store.transform(SHIP), Some(transform(4.0)));
        assert!(store.flush().is_empty());
    }

    #[test]
    fn when_write_changes_nothing_then_no_message_is_scheduled() {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::all()));
        store.seed(SHIP, ComponentValue::PlanetIndex(3));

        store
            .write(SHIP, ComponentValue::PlanetIndex(3))
            .expect("authoritative");

        assert!(store.flush().is_empty());
    }

    #[test]
    fn when_rotation_only_delta_arrives_then_position_and_scale_are_kept() {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::none()));
        store.seed(SHIP, ComponentValue::TransformInfo(transform(5.0)));
        let rotation = DQuat::from_rotation_x(1.2);

        let outcome = store.apply_remote_update(&ReplicationMessage {
            entity: SHIP,
            delta: ComponentDelta::TransformInfo(TransformDelta {
                position: None,
                rotation: Some(rotation),
                scale: None,
            }),
        });

        assert_eq!(outcome, ApplyOutcome::Applied);
        let mirrored = store.transform(SHIP).expect("mirrored");
        assert_eq!(mirrored.position, DVec3::new(5.0, 0.0, 0.0));
        assert_eq!(mirrored.scale, DVec3::splat(2.0));
        assert_eq!(mirrored.rotation, rotation);
    }

    #[test]
    fn when_partial_delta_reaches_uninitialized_mirror_then_fields_apply_over_defaults() {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::none()));

        let outcome = store.apply_remote_update(&ReplicationMessage {
            entity: SHIP,
            delta: ComponentDelta::TransformInfo(TransformDelta {
                position: Some(DVec3::X),
                rotation: None,
                scale: None,
            }),
        });

        assert!(matches!(
            outcome,
            ApplyOutcome::Partial(SimError::StaleReplicationUpdate { .. })
        ));
        let mirrored = store.transform(SHIP).expect("initialized");
        assert_eq!(mirrored.position, DVec3::X);
        assert_eq!(mirrored.scale, DVec3::ONE);
    }

    #[test]
    fn when_authoritative_node_receives_remote_update_then_it_is_ignored() {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::all()));
        store.seed(SHIP, ComponentValue::Position(Position { coords: DVec3::ZERO }));

        let outcome = store.apply_remote_update(&ReplicationMessage {
            entity: SHIP,
            delta: ComponentDelta::Position(Position { coords: DVec3::Y }),
        });

        assert_eq!(outcome, ApplyOutcome::IgnoredAuthoritative);
        assert_eq!(
            store.read(SHIP, ComponentKind::Position),
            Some(&ComponentValue::Position(Position { coords: DVec3::ZERO }))
        );
    }

    #[test]
    fn when_writer_flushes_then_reader_mirror_converges() {
        let mut writer = SpatialStore::new(Arc::new(FixedAuthority::all()));
        let mut reader = SpatialStore::new(Arc::new(FixedAuthority::none()));
        writer.seed(SHIP, ComponentValue::TransformInfo(transform(0.0)));
        for message in writer.full_state() {
            reader.apply_remote_update(&message);
        }

        for step in 1..=3 {
            writer
                .write(SHIP, ComponentValue::TransformInfo(transform(f64::from(step))))
                .expect("authoritative");
            for message in writer.flush() {
                assert_eq!(reader.apply_remote_update(&message), ApplyOutcome::Applied);
            }
        }

        assert_eq!(reader.transform(SHIP), writer.transform(SHIP));
    }

    #[test]
    fn when_entity_is_removed_then_its_pending_deltas_are_dropped() {
        let mut store = SpatialStore::new(Arc::new(FixedAuthority::all()));
        store
            .write(SHIP, ComponentValue::PlanetIndex(1))
            .expect("authoritative");

        assert!(store.remove(SHIP));
        assert!(store.flush().is_empty());
        assert!(!store.contains(SHIP));
    }
}
