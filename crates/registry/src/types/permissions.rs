//! Resource permission types.
//!
//! This module defines how visibility settings translate into permission grants
//! on registry paths. Backends store the grants; the registry layer only asks
//! for them to be applied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role granted to unauthenticated callers.
pub const ANONYMOUS_ROLE: &str = "system/anonymous";

/// Role every authenticated user of a tenant holds.
pub const EVERYONE_ROLE: &str = "internal/everyone";

/// Registry actions that can be authorized on a path.
///
/// Migration only ever grants read access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read the resource.
    Get,
}

impl Action {
    /// Returns the action name as stored by backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Get => "get",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Action::Get),
            other => Err(format!("unknown registry action: {}", other)),
        }
    }
}

/// Visibility of a governance resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Readable by everyone, including anonymous callers.
    #[default]
    Public,
    /// Readable by the listed roles only.
    Restricted,
    /// Readable by the tenant admin only.
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Restricted => write!(f, "restricted"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "" => Ok(Visibility::Public),
            "restricted" => Ok(Visibility::Restricted),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility: {}", other)),
        }
    }
}

/// The holder of a permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Subject {
    /// A role.
    Role(String),
    /// A single user.
    User(String),
}

impl Subject {
    /// Returns the subject kind as stored by backends.
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Role(_) => "role",
            Subject::User(_) => "user",
        }
    }

    /// Returns the role or user name.
    pub fn name(&self) -> &str {
        match self {
            Subject::Role(name) | Subject::User(name) => name,
        }
    }

    /// Rebuilds a subject from its stored kind and name.
    pub fn from_parts(kind: &str, name: impl Into<String>) -> Option<Self> {
        match kind {
            "role" => Some(Subject::Role(name.into())),
            "user" => Some(Subject::User(name.into())),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.name())
    }
}

/// Permission for a subject to perform an action on a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Who is allowed.
    pub subject: Subject,
    /// The registry path.
    pub path: String,
    /// What is allowed.
    pub action: Action,
}

impl PermissionGrant {
    /// Creates a grant.
    pub fn new(subject: Subject, path: impl Into<String>, action: Action) -> Self {
        Self {
            subject,
            path: path.into(),
            action,
        }
    }
}

/// Computes the read grants implied by a visibility setting.
///
/// - `Public`: anonymous and everyone roles
/// - `Restricted`: each listed role (blank entries ignored)
/// - `Private`: the admin user only
///
/// ```
/// use appmig_registry::types::{grants_for_visibility, Subject, Visibility};
///
/// let grants = grants_for_visibility(Visibility::Private, &[], "admin", "/apps/a");
/// assert_eq!(grants.len(), 1);
/// assert_eq!(grants[0].subject, Subject::User("admin".to_string()));
/// ```
pub fn grants_for_visibility(
    visibility: Visibility,
    roles: &[String],
    admin_name: &str,
    path: &str,
) -> Vec<PermissionGrant> {
    match visibility {
        Visibility::Public => vec![
            PermissionGrant::new(Subject::Role(ANONYMOUS_ROLE.to_string()), path, Action::Get),
            PermissionGrant::new(Subject::Role(EVERYONE_ROLE.to_string()), path, Action::Get),
        ],
        Visibility::Restricted => roles
            .iter()
            .map(|role| role.trim())
            .filter(|role| !role.is_empty())
            .map(|role| PermissionGrant::new(Subject::Role(role.to_string()), path, Action::Get))
            .collect(),
        Visibility::Private => vec![PermissionGrant::new(
            Subject::User(admin_name.to_string()),
            path,
            Action::Get,
        )],
    }
}
