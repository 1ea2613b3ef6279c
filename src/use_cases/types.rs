// Use-case level inputs/outputs for the simulation loop.

use crate::domain::time::TimeCommand;
use crate::domain::{ComponentKind, ComponentValue, EntityId, QueryHit, ReplicationMessage};
use tokio::sync::oneshot;

/// Everything the world task drains from its inbound channel before a tick.
#[derive(Debug)]
pub enum NodeEvent {
    Remote(ReplicationMessage),
    Spawn {
        entity: EntityId,
        components: Vec<ComponentValue>,
    },
    Despawn {
        entity: EntityId,
    },
    AuthorityGranted {
        entity: EntityId,
        kind: ComponentKind,
    },
    AuthorityRevoked {
        entity: EntityId,
        kind: ComponentKind,
    },
    Time(TimeCommand),
    /// Full state for a newly connected reader.
    Snapshot {
        reply: oneshot::Sender<Vec<ReplicationMessage>>,
    },
    Query {
        kind: ComponentKind,
        reply: oneshot::Sender<Vec<QueryHit>>,
    },
}

/// One tick's outbound replication.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationBatch {
    pub tick: u64,
    pub messages: Vec<ReplicationMessage>,
    pub despawned: Vec<EntityId>,
}

impl ReplicationBatch {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.despawned.is_empty()
    }
}
