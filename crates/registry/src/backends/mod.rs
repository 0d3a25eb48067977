//! Registry platform implementations.
//!
//! Each platform implements [`RegistryBackend`](crate::core::RegistryBackend),
//! [`TenantDirectory`](crate::core::TenantDirectory) and
//! [`ProviderFactory`](crate::core::ProviderFactory), so one instance can back
//! a [`TenantRegistry`](crate::TenantRegistry) through
//! [`TenantRegistry::from_platform`](crate::TenantRegistry::from_platform).
//!
//! # Available Platforms
//!
//! | Platform | Feature | Description |
//! |----------|---------|-------------|
//! | Memory | - | Process-local state, used by tests and dry runs |
//! | SQLite | `sqlite` | Embedded database, in-memory or file-based |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! use appmig_registry::backends::sqlite::SqliteRegistry;
//!
//! # #[cfg(feature = "sqlite")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = SqliteRegistry::open("./data/registry.db")?;
//! platform.init_schema()?;
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
