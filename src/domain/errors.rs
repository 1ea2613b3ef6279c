// Domain-level errors for the simulation core. None of these are fatal to the process.

use crate::domain::components::{ComponentKind, EntityId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("node lacks write authority for {kind} on entity {entity}")]
    NotAuthoritative {
        entity: EntityId,
        kind: ComponentKind,
    },

    #[error("invalid orbit parameters: {reason}")]
    InvalidOrbitParameters { reason: String },

    #[error("warp query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("update for {kind} on entity {entity} reached an uninitialized mirror")]
    StaleReplicationUpdate {
        entity: EntityId,
        kind: ComponentKind,
    },
}
