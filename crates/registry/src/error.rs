//! Error types for the registry layer.
//!
//! Errors are grouped by category: session lifecycle violations, tenant identity
//! resolution, resource state, governance artifacts, artifact descriptors and
//! backend transport/storage faults. [`RegistryError`] wraps every category so
//! callers can match coarsely or drill into the specific variant.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::tenant::TenantId;
use crate::types::PartitionKind;

/// The primary error type for all registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Session lifecycle violations
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Tenant and realm lookup failures
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Governance artifact errors
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Artifact descriptor errors
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Registry transport and storage errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl RegistryError {
    /// Returns `true` if this error is a session lifecycle violation.
    pub fn is_session_error(&self) -> bool {
        matches!(self, RegistryError::Session(_))
    }

    /// Returns `true` if this error reports an absent resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::Resource(ResourceError::NotFound { .. }))
    }
}

/// Violations of the begin/end tenant flow contract.
///
/// These are programmer errors and are never worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// An operation was attempted outside a tenant flow.
    #[error("the tenant flow has not been started, start_tenant_flow needs to be called")]
    NotStarted,

    /// A tenant flow was started while another one is still active.
    #[error(
        "previous tenant flow for {domain} ({tenant_id}) has not been ended, end_tenant_flow needs to be called"
    )]
    AlreadyActive { tenant_id: TenantId, domain: String },
}

/// Errors raised while resolving tenant identity.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The tenant is not known to the tenant directory.
    #[error("tenant not found: {tenant}")]
    TenantNotFound { tenant: String },

    /// The domain already belongs to another tenant.
    #[error("domain {domain} is already registered to tenant {tenant_id}")]
    DuplicateDomain { domain: String, tenant_id: TenantId },

    /// The principal may not open registries of the tenant.
    #[error("principal {principal} is not permitted to access registry of tenant {tenant_id}")]
    PrincipalRejected {
        tenant_id: TenantId,
        principal: String,
    },

    /// The tenant's user realm could not be reached.
    #[error("user realm unavailable for tenant {tenant_id}: {message}")]
    RealmUnavailable { tenant_id: TenantId, message: String },
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested resource does not exist.
    #[error("resource not found in {partition} registry: {path}")]
    NotFound {
        partition: PartitionKind,
        path: String,
    },

    /// The path is not a valid registry path.
    #[error("invalid registry path: {path:?}")]
    InvalidPath { path: String },
}

/// Errors related to governance artifacts.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// No artifact manager is registered for the type.
    #[error("no artifact manager available for type {artifact_type}")]
    ManagerUnavailable { artifact_type: String },

    /// The artifact does not exist in the governance registry.
    #[error("artifact not found: {artifact_type}/{id}")]
    NotFound { artifact_type: String, id: String },

    /// No governance path holds an artifact with the given ID.
    #[error("artifact {id} could not be located in the governance registry")]
    NotLocated { id: String },

    /// The artifact is structurally invalid.
    #[error("invalid artifact {id}: {message}")]
    Invalid { id: String, message: String },
}

/// Errors related to artifact descriptors (RXT documents).
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// The descriptor name cannot be used to derive a registry path.
    #[error("invalid descriptor name: {name:?}")]
    InvalidName { name: String },

    /// The descriptor has no `<content>` element to project.
    #[error("descriptor {name} has no <content> element")]
    MissingContent { name: String },

    /// The descriptor payload is not well-formed.
    #[error("malformed descriptor {name}: {message}")]
    Malformed { name: String, message: String },
}

/// Errors originating from the registry backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// The tenant's registry has not been loaded.
    #[error("registry of tenant {tenant_id} has not been loaded")]
    TenantNotLoaded { tenant_id: TenantId },

    /// A transaction is already open on the partition.
    #[error("a transaction is already active on the {partition} registry")]
    TransactionActive { partition: PartitionKind },

    /// No transaction is open on the partition.
    #[error("no transaction is active on the {partition} registry")]
    NoTransaction { partition: PartitionKind },

    /// Schema initialisation or upgrade failed.
    #[error("schema upgrade failed: {message}")]
    SchemaError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        RegistryError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for RegistryError {
    fn from(_err: r2d2::Error) -> Self {
        RegistryError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}
