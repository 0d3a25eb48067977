//! In-memory partition handles.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::MemoryState;
use crate::core::RegistryPartition;
use crate::error::{BackendError, RegistryResult, ResourceError};
use crate::tenant::TenantId;
use crate::types::{PartitionKind, Resource, child_of, normalize_path};

/// Contents of one partition of one tenant.
#[derive(Debug, Default)]
pub(super) struct PartitionStore {
    pub(super) resources: BTreeMap<String, Resource>,
    /// Contents as of `begin_transaction`, while a transaction is open.
    pub(super) snapshot: Option<BTreeMap<String, Resource>>,
}

/// A handle on one in-memory partition.
pub struct MemoryPartition {
    state: Arc<RwLock<MemoryState>>,
    tenant_id: TenantId,
    kind: PartitionKind,
}

impl std::fmt::Debug for MemoryPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPartition")
            .field("tenant_id", &self.tenant_id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl MemoryPartition {
    pub(super) fn new(
        state: Arc<RwLock<MemoryState>>,
        tenant_id: TenantId,
        kind: PartitionKind,
    ) -> Self {
        Self {
            state,
            tenant_id,
            kind,
        }
    }

    fn key(&self) -> (TenantId, PartitionKind) {
        (self.tenant_id, self.kind)
    }
}

#[async_trait]
impl RegistryPartition for MemoryPartition {
    fn kind(&self) -> PartitionKind {
        self.kind
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    async fn exists(&self, path: &str) -> RegistryResult<bool> {
        let path = normalize_path(path)?;
        let state = self.state.read();
        Ok(state
            .partitions
            .get(&self.key())
            .is_some_and(|store| store.resources.contains_key(&path)))
    }

    async fn get(&self, path: &str) -> RegistryResult<Resource> {
        let path = normalize_path(path)?;
        let state = self.state.read();
        state
            .partitions
            .get(&self.key())
            .and_then(|store| store.resources.get(&path))
            .cloned()
            .ok_or_else(|| {
                ResourceError::NotFound {
                    partition: self.kind,
                    path,
                }
                .into()
            })
    }

    async fn put(&self, path: &str, resource: Resource) -> RegistryResult<()> {
        let path = normalize_path(path)?;
        let mut state = self.state.write();
        state
            .partitions
            .entry(self.key())
            .or_default()
            .resources
            .insert(path, resource);
        Ok(())
    }

    async fn children(&self, path: &str) -> RegistryResult<Vec<String>> {
        let parent = normalize_path(path)?;
        let state = self.state.read();
        let children: BTreeSet<String> = state
            .partitions
            .get(&self.key())
            .map(|store| {
                store
                    .resources
                    .keys()
                    .filter_map(|stored| child_of(&parent, stored))
                    .collect()
            })
            .unwrap_or_default();
        Ok(children.into_iter().collect())
    }

    async fn begin_transaction(&self) -> RegistryResult<()> {
        let mut state = self.state.write();
        let store = state.partitions.entry(self.key()).or_default();
        if store.snapshot.is_some() {
            return Err(BackendError::TransactionActive {
                partition: self.kind,
            }
            .into());
        }
        store.snapshot = Some(store.resources.clone());
        Ok(())
    }

    async fn commit_transaction(&self) -> RegistryResult<()> {
        let mut state = self.state.write();
        let store = state.partitions.entry(self.key()).or_default();
        store
            .snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| {
                BackendError::NoTransaction {
                    partition: self.kind,
                }
                .into()
            })
    }

    async fn rollback_transaction(&self) -> RegistryResult<()> {
        let mut state = self.state.write();
        let store = state.partitions.entry(self.key()).or_default();
        match store.snapshot.take() {
            Some(snapshot) => {
                store.resources = snapshot;
                Ok(())
            }
            None => Err(BackendError::NoTransaction {
                partition: self.kind,
            }
            .into()),
        }
    }
}
