// In-process authority assignment: one owner per (entity, component), shared by every node in
// the process.

use crate::domain::{AuthorityAssignment, ComponentKind, EntityId, NodeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

type Owners = HashMap<(EntityId, ComponentKind), NodeId>;

#[derive(Clone, Default)]
pub struct AuthorityTable {
    owners: Arc<RwLock<Owners>>,
}

impl AuthorityTable {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Owners> {
        self.owners.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Owners> {
        self.owners.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Hands `kind` on `entity` to `node`, returning the previous owner.
    pub fn grant(&self, entity: EntityId, kind: ComponentKind, node: &NodeId) -> Option<NodeId> {
        let previous = self.write().insert((entity, kind), node.clone());
        debug!(%entity, %kind, %node, previous = ?previous, "authority granted");
        previous
    }

    pub fn grant_all(&self, entity: EntityId, kinds: &[ComponentKind], node: &NodeId) {
        let mut owners = self.write();
        for kind in kinds {
            owners.insert((entity, *kind), node.clone());
        }
    }

    pub fn revoke(&self, entity: EntityId, kind: ComponentKind) -> Option<NodeId> {
        self.write().remove(&(entity, kind))
    }

    /// Drops every assignment for `entity`.
    pub fn revoke_entity(&self, entity: EntityId) -> Vec<(ComponentKind, NodeId)> {
        let mut owners = self.write();
        let kinds: Vec<ComponentKind> = owners
            .keys()
            .filter(|(id, _)| *id == entity)
            .map(|(_, kind)| *kind)
            .collect();
        kinds
            .into_iter()
            .filter_map(|kind| owners.remove(&(entity, kind)).map(|node| (kind, node)))
            .collect()
    }

    pub fn owner(&self, entity: EntityId, kind: ComponentKind) -> Option<NodeId> {
        self.read().get(&(entity, kind)).cloned()
    }

    /// The assignment as one node sees it.
    pub fn view_for(&self, node: NodeId) -> NodeAuthority {
        NodeAuthority {
            node,
            table: self.clone(),
        }
    }
}

pub struct NodeAuthority {
    node: NodeId,
    table: AuthorityTable,
}

impl NodeAuthority {
    pub fn node(&self) -> &NodeId {
        &self.node
    }
}

impl AuthorityAssignment for NodeAuthority {
    fn has_authority(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.table
            .read()
            .get(&(entity, kind))
            .is_some_and(|owner| *owner == self.node)
    }
}
