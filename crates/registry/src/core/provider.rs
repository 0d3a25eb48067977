//! Provider handles used for permission assignment.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RegistryResult;
use crate::tenant::TenantId;
use crate::types::Visibility;

/// Creates provider handles acting on behalf of a tenant admin.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Returns a provider acting as `admin_name` within the tenant.
    async fn provider(
        &self,
        tenant_id: TenantId,
        admin_name: &str,
    ) -> RegistryResult<Arc<dyn ResourceProvider>>;
}

/// A provider handle bound to one tenant admin.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Returns the admin this provider acts as.
    fn admin_name(&self) -> &str;

    /// Replaces the read permissions of a governance path.
    ///
    /// `roles` is only consulted for [`Visibility::Restricted`].
    async fn set_resource_permissions(
        &self,
        visibility: Visibility,
        roles: &[String],
        path: &str,
    ) -> RegistryResult<()>;
}
