//! AppMig Registry Layer
//!
//! This crate gives application manager migrations tenant-scoped access to a
//! multi-tenant registry platform. Every operation runs on behalf of one
//! tenant: resources are read from and written to that tenant's config or
//! governance partition, artifacts are listed and updated there, and
//! permissions and artifact descriptors are published for it.
//!
//! # Architecture
//!
//! - [`tenant`] - Tenant identity and the explicit per-flow [`TenantContext`]
//! - [`types`] - Resources, artifacts, permissions and [`QueryOutcome`]
//! - [`error`] - Error types for all operations
//! - [`core`] - Collaborator traits (tenant directory, backend, artifacts, providers)
//! - [`layout`] - Well-known registry locations
//! - [`service`] - [`TenantRegistry`], operations taking an explicit context
//! - [`session`] - [`TenantRegistrySession`], the begin/end tenant flow façade
//! - [`governance`] - Partition-backed artifact directory
//! - [`descriptor`] - Artifact descriptor (RXT) handling
//! - [`backends`] - In-memory and SQLite platforms
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use appmig_registry::backends::memory::MemoryRegistry;
//! use appmig_registry::tenant::{Tenant, TenantId};
//! use appmig_registry::{RegistryLayout, TenantRegistry, TenantRegistrySession};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), appmig_registry::RegistryError> {
//! let acme = Tenant::new(TenantId::new(5), "acme", "admin@acme");
//!
//! let platform = MemoryRegistry::new();
//! platform.register_tenant(acme.clone())?;
//!
//! let registry = Arc::new(TenantRegistry::from_platform(
//!     Arc::new(platform),
//!     RegistryLayout::default(),
//! ));
//!
//! let mut session = TenantRegistrySession::new(registry);
//! session.start_tenant_flow(acme)?;
//! session.put_config_resource("/t/x", b"v1", "text/plain").await?;
//! assert_eq!(session.get_config_resource("/t/x").await?, Some(b"v1".to_vec()));
//! session.end_tenant_flow();
//!
//! assert!(session.get_config_resource("/t/x").await.is_err());
//! # Ok(())
//! # }
//! ```
//!
//! # Tenant flows
//!
//! [`TenantRegistry`] takes a [`TenantContext`] on every call, so concurrent
//! flows for different tenants never share state. [`TenantRegistrySession`]
//! layers the start/end contract on top for callers that migrate one tenant
//! at a time.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod descriptor;
pub mod error;
pub mod governance;
pub mod layout;
pub mod service;
pub mod session;
pub mod tenant;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{RegistryError, RegistryResult};
pub use layout::RegistryLayout;
pub use service::TenantRegistry;
pub use session::TenantRegistrySession;
pub use tenant::{Tenant, TenantContext, TenantId};
pub use types::{Artifact, PartitionKind, QueryOutcome, Resource, Visibility, WebApp};

// Re-export core traits
pub use core::{
    ArtifactDirectory, ProviderFactory, RegistryBackend, RegistryPartition, ResourceProvider,
    TenantDirectory,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
