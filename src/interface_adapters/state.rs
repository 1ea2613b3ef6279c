use crate::domain::{NodeId, SimulationConfig};
use crate::interface_adapters::authority::AuthorityTable;
use crate::interface_adapters::utils::ids::EntityIdAllocator;
use crate::use_cases::NodeEvent;
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use tokio::sync::{Notify, broadcast, mpsc};

pub struct AppState {
    // Events flowing from the network into the world task.
    pub input_tx: mpsc::Sender<NodeEvent>,
    // Serialized replication batches, shared across all connections.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    pub authority: AuthorityTable,
    // The node that simulates every spatial component in this process.
    pub sim_node: NodeId,
    pub config: SimulationConfig,
    pub entity_ids: EntityIdAllocator,
    pub shutdown: Arc<Notify>,
}
