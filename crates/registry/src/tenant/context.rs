//! Tenant context for registry operations.
//!
//! [`TenantContext`] is the explicit per-tenant handle every registry operation
//! takes. It replaces ambient, thread-bound tenant state: two contexts for two
//! tenants can be used side by side from any task.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use super::id::{Tenant, TenantId};
use crate::core::ResourceProvider;
use crate::error::RegistryResult;

/// A tenant flow: the tenant plus state resolved lazily during the flow.
///
/// Cloning a context shares its lazily resolved provider handle. Dropping the
/// last clone ends the flow and discards the handle.
///
/// ```
/// use appmig_registry::tenant::{Tenant, TenantContext, TenantId};
///
/// let ctx = TenantContext::new(Tenant::new(TenantId::new(5), "acme", "admin"));
///
/// assert_eq!(ctx.tenant_id(), TenantId::new(5));
/// assert_eq!(ctx.domain(), "acme");
/// assert!(!ctx.has_provider());
/// ```
#[derive(Clone)]
pub struct TenantContext {
    tenant: Arc<Tenant>,
    provider: Arc<OnceCell<Arc<dyn ResourceProvider>>>,
}

impl TenantContext {
    /// Creates a fresh context for the tenant.
    pub fn new(tenant: Tenant) -> Self {
        Self {
            tenant: Arc::new(tenant),
            provider: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the tenant.
    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    /// Returns the tenant ID.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant.id()
    }

    /// Returns the tenant domain.
    pub fn domain(&self) -> &str {
        self.tenant.domain()
    }

    /// Returns the tenant admin's principal name.
    pub fn admin_name(&self) -> &str {
        self.tenant.admin_name()
    }

    /// Returns `true` once the provider handle has been resolved in this flow.
    pub fn has_provider(&self) -> bool {
        self.provider.initialized()
    }

    /// Returns the flow's provider handle, resolving it with `init` on first use.
    pub(crate) async fn provider_or_init<F, Fut>(
        &self,
        init: F,
    ) -> RegistryResult<Arc<dyn ResourceProvider>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RegistryResult<Arc<dyn ResourceProvider>>>,
    {
        self.provider.get_or_try_init(init).await.cloned()
    }
}

impl fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantContext")
            .field("tenant", &self.tenant)
            .field("has_provider", &self.has_provider())
            .finish()
    }
}
