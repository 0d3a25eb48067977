//! In-memory registry platform.
//!
//! [`MemoryRegistry`] keeps tenants, partition contents and permission grants
//! in process memory. Clones share state, so a test can keep a handle for
//! inspection while a [`TenantRegistry`](crate::TenantRegistry) uses another.
//!
//! ```
//! use std::sync::Arc;
//!
//! use appmig_registry::backends::memory::MemoryRegistry;
//! use appmig_registry::tenant::{Tenant, TenantId};
//! use appmig_registry::{RegistryLayout, TenantRegistry};
//!
//! # fn main() -> appmig_registry::RegistryResult<()> {
//! let platform = MemoryRegistry::new();
//! platform.register_tenant(Tenant::new(TenantId::new(5), "acme", "admin@acme"))?;
//!
//! let registry = TenantRegistry::from_platform(Arc::new(platform.clone()), RegistryLayout::default());
//! assert_eq!(platform.tenant_count(), 1);
//! # let _ = registry;
//! # Ok(())
//! # }
//! ```

mod partition;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

pub use partition::MemoryPartition;
use partition::PartitionStore;

use crate::core::{
    Principal, ProviderFactory, RegistryBackend, RegistryPartition, ResourceProvider,
    TenantDirectory,
};
use crate::error::{BackendError, IdentityError, RegistryResult};
use crate::tenant::{Tenant, TenantId};
use crate::types::{
    Action, PartitionKind, PermissionGrant, Resource, Subject, Visibility, grants_for_visibility,
    normalize_path,
};

#[derive(Debug)]
struct TenantRecord {
    tenant: Tenant,
    loaded: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    tenants: BTreeMap<TenantId, TenantRecord>,
    partitions: HashMap<(TenantId, PartitionKind), PartitionStore>,
    grants: BTreeMap<TenantId, Vec<PermissionGrant>>,
}

impl MemoryState {
    fn record(&self, tenant_id: TenantId) -> RegistryResult<&TenantRecord> {
        self.tenants.get(&tenant_id).ok_or_else(|| {
            IdentityError::TenantNotFound {
                tenant: tenant_id.to_string(),
            }
            .into()
        })
    }

    fn replace_grants(&mut self, tenant_id: TenantId, path: &str, grants: Vec<PermissionGrant>) {
        let recorded = self.grants.entry(tenant_id).or_default();
        recorded.retain(|grant| grant.path != path);
        recorded.extend(grants);
    }
}

/// Process-local registry platform.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRegistry {
    /// Creates an empty platform with no tenants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tenant, replacing any tenant with the same ID.
    ///
    /// The tenant starts unloaded. Fails with
    /// [`IdentityError::DuplicateDomain`] when another tenant owns the domain.
    pub fn register_tenant(&self, tenant: Tenant) -> RegistryResult<()> {
        let mut state = self.state.write();
        let owner = state.tenants.values().find(|record| {
            record.tenant.domain() == tenant.domain() && record.tenant.id() != tenant.id()
        });
        if let Some(owner) = owner {
            return Err(IdentityError::DuplicateDomain {
                domain: tenant.domain().to_string(),
                tenant_id: owner.tenant.id(),
            }
            .into());
        }

        debug!(tenant = %tenant, "Registered tenant");
        state.tenants.insert(
            tenant.id(),
            TenantRecord {
                tenant,
                loaded: false,
            },
        );
        Ok(())
    }

    /// Returns the number of registered tenants.
    pub fn tenant_count(&self) -> usize {
        self.state.read().tenants.len()
    }

    /// Returns `true` once the tenant's registry has been loaded.
    pub fn is_loaded(&self, tenant_id: TenantId) -> bool {
        self.state
            .read()
            .tenants
            .get(&tenant_id)
            .is_some_and(|record| record.loaded)
    }

    /// Returns every permission grant recorded for the tenant.
    pub fn grants(&self, tenant_id: TenantId) -> Vec<PermissionGrant> {
        self.state
            .read()
            .grants
            .get(&tenant_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the grants recorded on one path.
    pub fn grants_on(&self, tenant_id: TenantId, path: &str) -> Vec<PermissionGrant> {
        self.grants(tenant_id)
            .into_iter()
            .filter(|grant| grant.path == path)
            .collect()
    }

    /// Reads a stored resource directly, bypassing tenant loading and principals.
    pub fn resource(&self, tenant_id: TenantId, kind: PartitionKind, path: &str) -> Option<Resource> {
        let path = normalize_path(path).ok()?;
        self.state
            .read()
            .partitions
            .get(&(tenant_id, kind))
            .and_then(|store| store.resources.get(&path))
            .cloned()
    }
}

#[async_trait]
impl TenantDirectory for MemoryRegistry {
    async fn resolve_admin_user(&self, tenant_id: TenantId) -> RegistryResult<String> {
        let state = self.state.read();
        Ok(state.record(tenant_id)?.tenant.admin_name().to_string())
    }

    async fn ensure_tenant_loaded(&self, tenant_id: TenantId) -> RegistryResult<()> {
        let mut state = self.state.write();
        let record = state.tenants.get_mut(&tenant_id).ok_or_else(|| {
            IdentityError::TenantNotFound {
                tenant: tenant_id.to_string(),
            }
        })?;
        if !record.loaded {
            record.loaded = true;
            debug!(tenant_id = %tenant_id, "Loaded tenant registry");
        }
        Ok(())
    }

    async fn tenant_by_domain(&self, domain: &str) -> RegistryResult<Option<Tenant>> {
        let state = self.state.read();
        Ok(state
            .tenants
            .values()
            .find(|record| record.tenant.domain() == domain)
            .map(|record| record.tenant.clone()))
    }

    async fn list_tenants(&self) -> RegistryResult<Vec<Tenant>> {
        let state = self.state.read();
        Ok(state
            .tenants
            .values()
            .map(|record| record.tenant.clone())
            .collect())
    }

    async fn authorize_role(
        &self,
        tenant_id: TenantId,
        role: &str,
        path: &str,
        action: Action,
    ) -> RegistryResult<()> {
        let mut state = self.state.write();
        state.record(tenant_id)?;

        let grant = PermissionGrant::new(Subject::Role(role.to_string()), path, action);
        let recorded = state.grants.entry(tenant_id).or_default();
        if !recorded.contains(&grant) {
            recorded.push(grant);
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistry {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn open_partition(
        &self,
        kind: PartitionKind,
        principal: Principal,
        tenant_id: TenantId,
    ) -> RegistryResult<Arc<dyn RegistryPartition>> {
        {
            let state = self.state.read();
            let record = state.record(tenant_id)?;
            if !record.loaded {
                return Err(BackendError::TenantNotLoaded { tenant_id }.into());
            }
            if let Principal::User(name) = &principal {
                if name != record.tenant.admin_name() {
                    return Err(IdentityError::PrincipalRejected {
                        tenant_id,
                        principal: name.clone(),
                    }
                    .into());
                }
            }
        }

        Ok(Arc::new(MemoryPartition::new(
            self.state.clone(),
            tenant_id,
            kind,
        )))
    }
}

#[async_trait]
impl ProviderFactory for MemoryRegistry {
    async fn provider(
        &self,
        tenant_id: TenantId,
        admin_name: &str,
    ) -> RegistryResult<Arc<dyn ResourceProvider>> {
        {
            let state = self.state.read();
            let record = state.record(tenant_id)?;
            if record.tenant.admin_name() != admin_name {
                return Err(IdentityError::PrincipalRejected {
                    tenant_id,
                    principal: admin_name.to_string(),
                }
                .into());
            }
        }

        Ok(Arc::new(MemoryProvider {
            state: self.state.clone(),
            tenant_id,
            admin_name: admin_name.to_string(),
        }))
    }
}

/// Provider handle recording grants into a [`MemoryRegistry`].
struct MemoryProvider {
    state: Arc<RwLock<MemoryState>>,
    tenant_id: TenantId,
    admin_name: String,
}

#[async_trait]
impl ResourceProvider for MemoryProvider {
    fn admin_name(&self) -> &str {
        &self.admin_name
    }

    async fn set_resource_permissions(
        &self,
        visibility: Visibility,
        roles: &[String],
        path: &str,
    ) -> RegistryResult<()> {
        let grants = grants_for_visibility(visibility, roles, &self.admin_name, path);
        debug!(
            tenant_id = %self.tenant_id,
            path,
            visibility = ?visibility,
            grants = grants.len(),
            "Replacing resource permissions"
        );
        self.state.write().replace_grants(self.tenant_id, path, grants);
        Ok(())
    }
}
