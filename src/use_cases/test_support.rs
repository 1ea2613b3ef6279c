// Fakes for the domain ports, shared by use-case tests.

use crate::domain::{AuthorityAssignment, ComponentKind, EntityId, EntityQuery, QueryHit};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

pub struct FixedAuthority {
    all: bool,
    owned: Mutex<HashSet<(EntityId, ComponentKind)>>,
}

impl FixedAuthority {
    pub fn all() -> Self {
        Self {
            all: true,
            owned: Mutex::new(HashSet::new()),
        }
    }

    pub fn none() -> Self {
        Self {
            all: false,
            owned: Mutex::new(HashSet::new()),
        }
    }

    pub fn only(owned: impl IntoIterator<Item = (EntityId, ComponentKind)>) -> Self {
        Self {
            all: false,
            owned: Mutex::new(owned.into_iter().collect()),
        }
    }

    pub fn grant(&self, entity: EntityId, kind: ComponentKind) {
        self.owned.lock().unwrap().insert((entity, kind));
    }

    pub fn revoke(&self, entity: EntityId, kind: ComponentKind) {
        self.owned.lock().unwrap().remove(&(entity, kind));
    }
}

impl AuthorityAssignment for FixedAuthority {
    fn has_authority(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.all || self.owned.lock().unwrap().contains(&(entity, kind))
    }
}

pub struct StaticQuery {
    result: Result<Vec<QueryHit>, String>,
    delay: Duration,
}

impl StaticQuery {
    pub fn hits(hits: Vec<QueryHit>) -> Self {
        Self {
            result: Ok(hits),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl EntityQuery for StaticQuery {
    async fn entities_with(&self, kind: ComponentKind) -> Result<Vec<QueryHit>, String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone().map(|hits| {
            hits.into_iter()
                .filter(|hit| hit.value.kind() == kind)
                .collect()
        })
    }
}
