// Entity query service backed by the world task's inbound channel. The task answers on its next
// drain, so a query never blocks a tick.

use crate::domain::{ComponentKind, EntityQuery, QueryHit};
use crate::use_cases::NodeEvent;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

pub struct WorldQuery {
    input_tx: mpsc::Sender<NodeEvent>,
    timeout: Duration,
}

impl WorldQuery {
    pub fn new(input_tx: mpsc::Sender<NodeEvent>, timeout: Duration) -> Self {
        Self { input_tx, timeout }
    }
}

#[async_trait]
impl EntityQuery for WorldQuery {
    async fn entities_with(&self, kind: ComponentKind) -> Result<Vec<QueryHit>, String> {
        let (reply, response) = oneshot::channel();
        self.input_tx
            .send(NodeEvent::Query { kind, reply })
            .await
            .map_err(|_| "world task is gone".to_string())?;

        match timeout(self.timeout, response).await {
            Ok(Ok(hits)) => Ok(hits),
            Ok(Err(_)) => Err("query dropped without an answer".to_string()),
            Err(_) => Err(format!("query timed out after {:?}", self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComponentValue, EntityId};

    #[tokio::test]
    async fn when_world_answers_then_hits_are_returned() {
        let (input_tx, mut input_rx) = mpsc::channel(4);
        let query = WorldQuery::new(input_tx, Duration::from_secs(1));
        tokio::spawn(async move {
            if let Some(NodeEvent::Query { reply, .. }) = input_rx.recv().await {
                let _ = reply.send(vec![QueryHit {
                    entity: EntityId(3),
                    value: ComponentValue::PlanetIndex(2),
                }]);
            }
        });

        let hits = query
            .entities_with(ComponentKind::PlanetIndex)
            .await
            .expect("answered");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, EntityId(3));
    }

    #[tokio::test]
    async fn when_world_never_answers_then_query_times_out() {
        let (input_tx, _input_rx) = mpsc::channel(4);
        let query = WorldQuery::new(input_tx, Duration::from_millis(20));

        let result = query.entities_with(ComponentKind::PlanetIndex).await;

        assert!(result.expect_err("no answer").contains("timed out"));
    }
}
