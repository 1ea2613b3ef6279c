// Client-side node: mirrors the replicated world, authors its own ship's controls and produces
// rendered transforms in a floating-origin frame.

use super::store::{ApplyOutcome, SpatialStore};
use super::types::ReplicationBatch;
use crate::domain::floating_origin::FloatingOrigin;
use crate::domain::scales::to_local_vec;
use crate::domain::{
    AuthorityAssignment, ComponentKind, ComponentValue, EntityId, ReplicationMessage,
    ShipControls, SimError, WarpCommand, WarpTarget,
};
use glam::{DQuat, DVec3};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One entity as the renderer should place it this frame (local units, origin-relative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedEntity {
    pub entity: EntityId,
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

pub struct ClientView {
    store: SpatialStore,
    origin: FloatingOrigin,
    ship: Option<EntityId>,
    next_warp_sequence: u64,
}

impl ClientView {
    pub fn new(authority: Arc<dyn AuthorityAssignment>, floating_origin_threshold: f64) -> Self {
        Self {
            store: SpatialStore::new(authority),
            origin: FloatingOrigin::new(floating_origin_threshold),
            ship: None,
            next_warp_sequence: 1,
        }
    }

    pub fn store(&self) -> &SpatialStore {
        &self.store
    }

    pub fn origin(&self) -> &FloatingOrigin {
        &self.origin
    }

    pub fn ship(&self) -> Option<EntityId> {
        self.ship
    }

    /// Ties the view to the ship this client controls and focuses the camera on.
    pub fn attach(&mut self, ship: EntityId) {
        self.ship = Some(ship);
    }

    pub fn apply(&mut self, message: &ReplicationMessage) -> ApplyOutcome {
        self.store.apply_remote_update(message)
    }

    pub fn apply_batch(&mut self, batch: &ReplicationBatch) {
        for message in &batch.messages {
            self.apply(message);
        }
        for entity in &batch.despawned {
            self.store.remove(*entity);
        }
    }

    /// Writes steering input for the attached ship. Warp commands already issued are kept.
    pub fn set_controls(
        &mut self,
        target_speed: f32,
        target_steering: f32,
        warp_speed: u32,
    ) -> Result<(), SimError> {
        let Some(ship) = self.ship else {
            return Ok(());
        };
        let current = self.store.controls(ship).unwrap_or_default();
        self.store.write(
            ship,
            ComponentValue::ShipControls(ShipControls {
                target_speed,
                target_steering,
                warp_speed,
                warp: current.warp,
            }),
        )
    }

    /// Stamps a new warp command; returns its sequence number.
    pub fn request_warp(&mut self, target: WarpTarget) -> Result<Option<u64>, SimError> {
        let Some(ship) = self.ship else {
            return Ok(None);
        };
        let sequence = self.next_warp_sequence;
        let mut controls = self.store.controls(ship).unwrap_or_default();
        controls.warp = Some(WarpCommand { sequence, target });
        self.store
            .write(ship, ComponentValue::ShipControls(controls))?;
        self.next_warp_sequence += 1;
        debug!(%ship, sequence, ?target, "warp requested");
        Ok(Some(sequence))
    }

    /// Control deltas to send upstream this frame.
    pub fn flush(&mut self) -> Vec<ReplicationMessage> {
        self.store.flush()
    }

    /// Rendered transforms for every spatial entity. Rebases first when the focused ship has
    /// drifted past the threshold, so the ship is always within it afterwards.
    pub fn present(&mut self) -> Vec<RenderedEntity> {
        let mut rendered: BTreeMap<EntityId, RenderedEntity> = self
            .store
            .entities_with(ComponentKind::TransformInfo)
            .into_iter()
            .filter_map(|(entity, value)| {
                let ComponentValue::TransformInfo(transform) = value else {
                    return None;
                };
                Some((
                    entity,
                    RenderedEntity {
                        entity,
                        position: self.origin.to_rendered(to_local_vec(transform.position)),
                        rotation: transform.rotation,
                        scale: to_local_vec(transform.scale),
                    },
                ))
            })
            .collect();

        let focus = self
            .ship
            .and_then(|ship| rendered.get(&ship))
            .map(|r| r.position);
        if let Some(focus) = focus
            && let Some(shift) = self
                .origin
                .rebase_if_needed(focus, rendered.values_mut().map(|r| &mut r.position))
        {
            debug!(?shift, offset = ?self.origin.offset(), "floating origin rebased");
        }

        rendered.into_values().collect()
    }
}
