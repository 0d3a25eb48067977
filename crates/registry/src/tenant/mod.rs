//! Tenant identity and flow context.
//!
//! # Core Types
//!
//! - [`TenantId`] - Numeric tenant identifier assigned by the platform
//! - [`Tenant`] - Immutable tenant descriptor (id, domain, admin principal)
//! - [`TenantContext`] - Explicit per-tenant flow handle required by every
//!   registry operation
//!
//! # Examples
//!
//! ```
//! use appmig_registry::tenant::{Tenant, TenantContext, TenantId};
//!
//! let acme = TenantContext::new(Tenant::new(TenantId::new(5), "acme", "admin@acme"));
//! let globex = TenantContext::new(Tenant::new(TenantId::new(6), "globex", "admin@globex"));
//!
//! assert_ne!(acme.tenant_id(), globex.tenant_id());
//! ```

mod context;
mod id;

pub use context::TenantContext;
pub use id::{Tenant, TenantId};
