use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ClusterError;
use crate::types::{OwnerRef, PodRecord};

pub const REPLICA_SET_KIND: &str = "ReplicaSet";
pub const DEPLOYMENT_KIND: &str = "Deployment";

/// Fetches the owner references of a replica-set.
#[async_trait]
pub trait OwnerLookup: Send + Sync {
    async fn replica_set_owners(&self, namespace: &str, name: &str) -> Result<Vec<OwnerRef>, ClusterError>;
}

/// Name of the first Deployment among a replica-set's owners.
pub fn deployment_owner(replica_set_owners: &[OwnerRef]) -> Option<&str> {
    replica_set_owners
        .iter()
        .find(|o| o.kind == DEPLOYMENT_KIND)
        .map(|o| o.name.as_str())
}

/// Walks pod -> ReplicaSet -> Deployment.
///
/// Returns `None` for pods not managed through a ReplicaSet owned by a
/// Deployment (bare pods, jobs, daemonsets, statefulsets). A failed
/// replica-set lookup only skips that owner reference.
pub async fn resolve_deployment<L: OwnerLookup + ?Sized>(pod: &PodRecord, lookup: &L) -> Option<String> {
    for owner in pod.owner_references.iter().filter(|o| o.kind == REPLICA_SET_KIND) {
        let owners = match lookup.replica_set_owners(&pod.namespace, &owner.name).await {
            Ok(owners) => owners,
            Err(e) if e.is_not_found() => {
                debug!(pod = %pod.key(), replica_set = %owner.name, "Replica-set gone, skipping owner");
                continue;
            }
            Err(e) => {
                warn!(pod = %pod.key(), replica_set = %owner.name, error = %e, "Replica-set lookup failed");
                continue;
            }
        };
        if let Some(deployment) = deployment_owner(&owners) {
            return Some(deployment.to_string());
        }
    }
    None
}

/// Memoizes successful replica-set lookups for the lifetime of one run.
pub struct CachingOwnerLookup<L> {
    inner: L,
    cache: Mutex<HashMap<(String, String), Vec<OwnerRef>>>,
}

impl<L: OwnerLookup> CachingOwnerLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn cached(&self, key: &(String, String)) -> Option<Vec<OwnerRef>> {
        self.cache.lock().ok().and_then(|c| c.get(key).cloned())
    }
}

#[async_trait]
impl<L: OwnerLookup> OwnerLookup for CachingOwnerLookup<L> {
    async fn replica_set_owners(&self, namespace: &str, name: &str) -> Result<Vec<OwnerRef>, ClusterError> {
        let key = (namespace.to_string(), name.to_string());
        if let Some(owners) = self.cached(&key) {
            return Ok(owners);
        }
        let owners = self.inner.replica_set_owners(namespace, name).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, owners.clone());
        }
        Ok(owners)
    }
}

#[async_trait]
impl<L: OwnerLookup + ?Sized> OwnerLookup for &L {
    async fn replica_set_owners(&self, namespace: &str, name: &str) -> Result<Vec<OwnerRef>, ClusterError> {
        (**self).replica_set_owners(namespace, name).await
    }
}
