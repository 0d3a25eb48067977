//! Registry backend abstraction.
//!
//! A [`RegistryBackend`] opens per-tenant [`RegistryPartition`] handles. The
//! handle is the key/value resource store the migration helper reads and
//! writes; it never sees connection details or storage layout.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RegistryResult;
use crate::tenant::TenantId;
use crate::types::{PartitionKind, Resource};

/// The identity a partition is opened with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    /// A named user of the tenant, typically its admin.
    User(String),
    /// The platform itself, bypassing user authorization.
    System,
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(name) => write!(f, "{}", name),
            Principal::System => write!(f, "<system>"),
        }
    }
}

/// A registry platform that can open tenant partitions.
///
/// # Example
///
/// ```no_run
/// use appmig_registry::RegistryResult;
/// use appmig_registry::core::{RegistryBackend, RegistryPartition};
/// use appmig_registry::tenant::TenantId;
///
/// async fn read_motd<B: RegistryBackend>(backend: &B, tenant_id: TenantId) -> RegistryResult<()> {
///     let config = backend.open_config_partition("admin", tenant_id).await?;
///     if config.exists("/motd").await? {
///         let motd = config.get("/motd").await?;
///         println!("{:?}", motd.content_str());
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Opens a partition of a tenant's registry as the given principal.
    ///
    /// # Errors
    ///
    /// * `RegistryError::Backend(TenantNotLoaded)` - if the tenant registry is not loaded
    /// * `RegistryError::Identity(PrincipalRejected)` - if the principal may not open it
    async fn open_partition(
        &self,
        kind: PartitionKind,
        principal: Principal,
        tenant_id: TenantId,
    ) -> RegistryResult<Arc<dyn RegistryPartition>>;

    /// Opens the tenant's config partition as a user.
    async fn open_config_partition(
        &self,
        principal: &str,
        tenant_id: TenantId,
    ) -> RegistryResult<Arc<dyn RegistryPartition>> {
        self.open_partition(
            PartitionKind::Config,
            Principal::User(principal.to_string()),
            tenant_id,
        )
        .await
    }

    /// Opens the tenant's governance partition as a user.
    async fn open_governance_partition(
        &self,
        principal: &str,
        tenant_id: TenantId,
    ) -> RegistryResult<Arc<dyn RegistryPartition>> {
        self.open_partition(
            PartitionKind::Governance,
            Principal::User(principal.to_string()),
            tenant_id,
        )
        .await
    }
}

/// A handle on one partition of one tenant's registry.
///
/// Paths are absolute and `/` separated. Handles are cheap; callers open a new
/// one per operation. Transaction state lives with the backend, so a
/// transaction begun through one handle is visible to later handles on the
/// same partition.
#[async_trait]
pub trait RegistryPartition: Send + Sync {
    /// Returns which partition this handle points at.
    fn kind(&self) -> PartitionKind;

    /// Returns the owning tenant.
    fn tenant_id(&self) -> TenantId;

    /// Checks whether a resource exists at the path.
    async fn exists(&self, path: &str) -> RegistryResult<bool>;

    /// Reads the resource at the path.
    ///
    /// # Errors
    ///
    /// * `RegistryError::Resource(NotFound)` - if nothing is stored at the path
    async fn get(&self, path: &str) -> RegistryResult<Resource>;

    /// Stores a resource at the path, replacing any existing one.
    async fn put(&self, path: &str, resource: Resource) -> RegistryResult<()>;

    /// Lists the direct children of a path, sorted.
    async fn children(&self, path: &str) -> RegistryResult<Vec<String>>;

    /// Opens a transaction on the partition.
    async fn begin_transaction(&self) -> RegistryResult<()>;

    /// Keeps every write made since [`begin_transaction`](Self::begin_transaction).
    async fn commit_transaction(&self) -> RegistryResult<()>;

    /// Discards every write made since [`begin_transaction`](Self::begin_transaction).
    async fn rollback_transaction(&self) -> RegistryResult<()>;
}
