use super::node::SimulationNode;
use super::types::{NodeEvent, ReplicationBatch};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, info};

pub async fn world_task(
    mut node: SimulationNode,
    mut input_rx: mpsc::Receiver<NodeEvent>,
    world_tx: broadcast::Sender<ReplicationBatch>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    // Drive the fixed-step simulation at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    let dt = tick_interval.as_secs_f64();
    info!(node = %node.node_id(), entities = node.store().entity_count(), "world task started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        while let Ok(event) = input_rx.try_recv() {
            node.handle(event);
        }

        let batch = node.tick(dt);
        if batch.is_empty() {
            continue;
        }
        // No subscribers is fine; clients come and go.
        if world_tx.send(batch).is_err() {
            debug!("replication batch dropped: no subscribers");
        }
    }

    info!(node = %node.node_id(), "world task stopped");
}
