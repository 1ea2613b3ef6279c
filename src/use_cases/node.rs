// One simulation node: owns a store, a clock and the ship integrators for whatever it is
// authoritative over. Driven from outside through `handle` and `tick`.

use super::store::{ApplyOutcome, SpatialStore};
use super::types::{NodeEvent, ReplicationBatch};
use super::warp::{self, WarpCoordinator};
use crate::domain::orbit::compute_transform;
use crate::domain::planets::planet_name;
use crate::domain::scales::{km_to_wire_vec, to_local_vec};
use crate::domain::ship::ShipState;
use crate::domain::time::{SimulationClock, TimeCommand};
use crate::domain::{
    AuthorityAssignment, ComponentKind, ComponentValue, EntityId, EntityQuery, EntityType,
    NodeId, Position, QueryHit, ReplicationMessage, SimError, SimulationConfig, TransformInfo,
    WarpTarget,
};
use glam::DVec3;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SimulationNode {
    node_id: NodeId,
    config: SimulationConfig,
    store: SpatialStore,
    clock: SimulationClock,
    ships: BTreeMap<EntityId, ShipState>,
    warp: WarpCoordinator,
    tick: u64,
    despawned: Vec<EntityId>,
}

impl SimulationNode {
    pub fn new(
        node_id: NodeId,
        config: SimulationConfig,
        authority: Arc<dyn AuthorityAssignment>,
        query: Arc<dyn EntityQuery>,
    ) -> Self {
        let clock = SimulationClock::new(config.time_acceleration);
        Self {
            node_id,
            config,
            store: SpatialStore::new(authority),
            clock,
            ships: BTreeMap::new(),
            warp: WarpCoordinator::new(query),
            tick: 0,
            despawned: Vec::new(),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn store(&self) -> &SpatialStore {
        &self.store
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn ship(&self, entity: EntityId) -> Option<&ShipState> {
        self.ships.get(&entity)
    }

    pub fn handle(&mut self, event: NodeEvent) {
        match event {
            NodeEvent::Remote(message) => {
                self.apply_remote(&message);
            }
            NodeEvent::Spawn { entity, components } => self.spawn(entity, components),
            NodeEvent::Despawn { entity } => self.despawn(entity),
            NodeEvent::AuthorityGranted { entity, kind } => self.on_authority_granted(entity, kind),
            NodeEvent::AuthorityRevoked { entity, kind } => self.on_authority_revoked(entity, kind),
            NodeEvent::Time(command) => self.time_control(command),
            NodeEvent::Snapshot { reply } => {
                // The requester may have hung up already.
                let _ = reply.send(self.store.full_state());
            }
            NodeEvent::Query { kind, reply } => {
                let hits = self
                    .store
                    .entities_with(kind)
                    .into_iter()
                    .map(|(entity, value)| QueryHit { entity, value })
                    .collect();
                let _ = reply.send(hits);
            }
        }
    }

    /// Loads an entity every node already knows about (world bootstrap). Nothing is replicated.
    pub fn seed(&mut self, entity: EntityId, components: Vec<ComponentValue>) {
        for value in components {
            self.store.seed(entity, value);
        }
        self.adopt_ship(entity);
    }

    /// Creates an entity at runtime. Every component goes out in full with the next batch, and
    /// ships this node is authoritative over start simulating immediately.
    pub fn spawn(&mut self, entity: EntityId, components: Vec<ComponentValue>) {
        for value in components {
            self.store.insert(entity, value);
        }
        debug!(%entity, node = %self.node_id, "entity spawned");
        self.adopt_ship(entity);
    }

    pub fn despawn(&mut self, entity: EntityId) {
        self.ships.remove(&entity);
        self.warp.forget(entity);
        if self.store.remove(entity) {
            debug!(%entity, node = %self.node_id, "entity despawned");
            self.despawned.push(entity);
        }
    }

    pub fn apply_remote(&mut self, message: &ReplicationMessage) -> ApplyOutcome {
        self.store.apply_remote_update(message)
    }

    pub fn on_authority_granted(&mut self, entity: EntityId, kind: ComponentKind) {
        info!(%entity, %kind, node = %self.node_id, "authority granted");
        if kind == ComponentKind::TransformInfo {
            self.adopt_ship(entity);
        }
    }

    pub fn on_authority_revoked(&mut self, entity: EntityId, kind: ComponentKind) {
        info!(%entity, %kind, node = %self.node_id, "authority revoked");
        if kind == ComponentKind::TransformInfo && self.ships.remove(&entity).is_some() {
            self.warp.forget(entity);
        }
    }

    pub fn time_control(&mut self, command: TimeCommand) {
        self.clock.control.apply(command);
        info!(
            ?command,
            paused = self.clock.control.paused(),
            scale = self.clock.control.scale(),
            "time control"
        );
    }

    /// Advances one fixed step of `real_dt` seconds and returns the tick's coalesced deltas.
    pub fn tick(&mut self, real_dt: f64) -> ReplicationBatch {
        self.tick += 1;
        self.clock.advance(real_dt);

        self.apply_warp_resolutions();
        self.step_orbits();
        self.step_ships(real_dt);

        ReplicationBatch {
            tick: self.tick,
            messages: self.store.flush(),
            despawned: std::mem::take(&mut self.despawned),
        }
    }

    // Starts integrating a ship once this node owns its transform. Ships already known keep
    // their state; the integrator seeds from the last mirrored transform otherwise.
    fn adopt_ship(&mut self, entity: EntityId) {
        if self.ships.contains_key(&entity)
            || !self.store.has_authority(entity, ComponentKind::TransformInfo)
            || self.store.read(entity, ComponentKind::EntityType)
                != Some(&ComponentValue::EntityType(EntityType::PlayerShip))
        {
            return;
        }

        let transform = self.store.transform(entity).unwrap_or_default();
        let mut state = ShipState::from_transform(&transform);
        // Commands issued before the handoff were already handled by the previous owner.
        state.last_warp_sequence = self
            .store
            .controls(entity)
            .and_then(|controls| controls.warp)
            .map_or(0, |command| command.sequence);
        self.ships.insert(entity, state);
        info!(%entity, node = %self.node_id, "simulating ship");
    }

    fn apply_warp_resolutions(&mut self) {
        for resolution in self.warp.drain_ready() {
            let Some(ship) = self.ships.get_mut(&resolution.ship) else {
                continue;
            };

            match warp::resolve_destination(&resolution, &self.store, self.config.warp_clearance)
            {
                Ok(destination) => {
                    let rotation = ship.rotation;
                    ship.relocate(destination, rotation);
                    info!(
                        ship = %resolution.ship,
                        body = planet_name(resolution.target_index),
                        sequence = resolution.sequence,
                        "warped to body"
                    );
                }
                Err(err) => warn!(
                    ship = %resolution.ship,
                    body = planet_name(resolution.target_index),
                    error = %err,
                    "warp left ship in place"
                ),
            }
        }
    }

    fn step_orbits(&mut self) {
        let elapsed = self.clock.elapsed_seconds();
        for (entity, value) in self.store.entities_with(ComponentKind::OrbitInfo) {
            let ComponentValue::OrbitInfo(orbit) = value else {
                continue;
            };
            if !self.store.has_authority(entity, ComponentKind::TransformInfo) {
                continue;
            }

            let sample = match compute_transform(&orbit, elapsed) {
                Ok(sample) => sample,
                Err(err) => {
                    warn!(%entity, error = %err, "orbit skipped");
                    continue;
                }
            };
            let scale = self
                .store
                .transform(entity)
                .map_or(DVec3::ONE, |t| t.scale);
            self.publish(
                entity,
                TransformInfo {
                    position: sample.position,
                    rotation: sample.rotation,
                    scale,
                },
            );
        }
    }

    fn step_ships(&mut self, dt: f64) {
        let spawn_position = to_local_vec(km_to_wire_vec(self.config.spawn.position_km()));
        let spawn_rotation = self.config.spawn.rotation();
        let mut updates = Vec::with_capacity(self.ships.len());

        for (&entity, ship) in self.ships.iter_mut() {
            // Authority can move between ticks without a revoke reaching us first.
            if !self.store.has_authority(entity, ComponentKind::TransformInfo) {
                continue;
            }
            let controls = self.store.controls(entity).unwrap_or_default();

            if let Some(command) = controls.warp
                && command.sequence > ship.last_warp_sequence
            {
                ship.last_warp_sequence = command.sequence;
                match command.target {
                    WarpTarget::ReturnToStart => {
                        self.warp.supersede(entity, command.sequence);
                        ship.relocate(spawn_position, spawn_rotation);
                        info!(%entity, sequence = command.sequence, "returned to start");
                    }
                    WarpTarget::Body(index) => {
                        self.warp.request(entity, command.sequence, index);
                    }
                }
            }

            ship.step(&controls, dt, &self.config.ship);
            let scale = self
                .store
                .transform(entity)
                .map_or(DVec3::ONE, |t| t.scale);
            updates.push((entity, ship.to_transform(scale)));
        }

        for (entity, transform) in updates {
            self.publish(entity, transform);
        }
    }

    fn publish(&mut self, entity: EntityId, transform: TransformInfo) {
        let results = [
            self.store
                .write(entity, ComponentValue::TransformInfo(transform)),
            self.store.write(
                entity,
                ComponentValue::Position(Position {
                    coords: transform.position,
                }),
            ),
        ];
        for result in results {
            if let Err(err @ SimError::NotAuthoritative { .. }) = result {
                debug!(%entity, error = %err, "publish skipped");
            }
        }
    }
}
