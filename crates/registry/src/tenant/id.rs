//! Tenant identity types.
//!
//! This module defines [`TenantId`], the numeric identifier the platform assigns
//! to every tenant, and [`Tenant`], the immutable tenant descriptor a caller
//! supplies when starting a tenant flow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A numeric tenant identifier.
///
/// # Examples
///
/// ```
/// use appmig_registry::tenant::TenantId;
///
/// let tenant = TenantId::new(5);
/// assert_eq!(tenant.value(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i32);

impl TenantId {
    /// Creates a tenant ID from its numeric value.
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TenantId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl FromStr for TenantId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i32>().map(Self)
    }
}

/// A tenant of the registry platform.
///
/// Tenants are owned by the tenant directory. The migration helper only holds
/// a copy for the duration of a tenant flow and never mutates it.
///
/// # Examples
///
/// ```
/// use appmig_registry::tenant::{Tenant, TenantId};
///
/// let tenant = Tenant::new(TenantId::new(5), "acme", "admin@acme");
/// assert_eq!(tenant.domain(), "acme");
/// assert_eq!(tenant.to_string(), "acme(5)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant {
    id: TenantId,
    domain: String,
    admin_name: String,
}

impl Tenant {
    /// Creates a tenant descriptor.
    pub fn new(id: TenantId, domain: impl Into<String>, admin_name: impl Into<String>) -> Self {
        Self {
            id,
            domain: domain.into(),
            admin_name: admin_name.into(),
        }
    }

    /// Returns the tenant ID.
    pub fn id(&self) -> TenantId {
        self.id
    }

    /// Returns the tenant domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the tenant admin's principal name.
    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.domain, self.id)
    }
}
