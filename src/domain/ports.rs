use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::components::{ComponentKind, ComponentValue, EntityId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Port for the externally assigned write authority. Checked before every write; the core never
// caches the answer across ticks.
pub trait AuthorityAssignment: Send + Sync {
    fn has_authority(&self, entity: EntityId, kind: ComponentKind) -> bool;
}

// One entity matched by a component query, with the component's current value.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub entity: EntityId,
    pub value: ComponentValue,
}

// Port for the asynchronous entity query service used by warp.
#[async_trait]
pub trait EntityQuery: Send + Sync {
    async fn entities_with(&self, kind: ComponentKind) -> Result<Vec<QueryHit>, String>;
}
