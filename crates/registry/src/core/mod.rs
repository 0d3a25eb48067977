//! Collaborator traits of the registry layer.
//!
//! The migration helper owns none of the platform it talks to. These traits
//! are the seams to that platform:
//!
//! - [`TenantDirectory`] - tenant lookup, loading and role authorization
//! - [`RegistryBackend`] / [`RegistryPartition`] - partitioned resource store
//! - [`ArtifactDirectory`] - typed governance artifacts
//! - [`ProviderFactory`] / [`ResourceProvider`] - per-admin permission handles
//!
//! The crate ships in-memory and SQLite implementations in
//! [`backends`](crate::backends) and a partition-backed artifact directory in
//! [`governance`](crate::governance).

pub mod artifacts;
pub mod backend;
pub mod directory;
pub mod provider;

pub use artifacts::ArtifactDirectory;
pub use backend::{Principal, RegistryBackend, RegistryPartition};
pub use directory::TenantDirectory;
pub use provider::{ProviderFactory, ResourceProvider};
