//! Tenant directory abstraction.

use async_trait::async_trait;

use crate::error::RegistryResult;
use crate::tenant::{Tenant, TenantId};
use crate::types::Action;

/// The platform's tenant management and user realm service.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Resolves the principal name of the tenant's admin from its realm.
    ///
    /// # Errors
    ///
    /// * `RegistryError::Identity` - if the tenant or its realm cannot be resolved
    async fn resolve_admin_user(&self, tenant_id: TenantId) -> RegistryResult<String>;

    /// Loads the tenant's registry so partitions can be opened.
    ///
    /// Loading an already loaded tenant is a no-op.
    async fn ensure_tenant_loaded(&self, tenant_id: TenantId) -> RegistryResult<()>;

    /// Looks a tenant up by domain.
    async fn tenant_by_domain(&self, domain: &str) -> RegistryResult<Option<Tenant>>;

    /// Lists all tenants, ordered by ID.
    async fn list_tenants(&self) -> RegistryResult<Vec<Tenant>>;

    /// Authorizes a role for an action on an absolute registry path.
    async fn authorize_role(
        &self,
        tenant_id: TenantId,
        role: &str,
        path: &str,
        action: Action,
    ) -> RegistryResult<()>;
}
