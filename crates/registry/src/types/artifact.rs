//! Governance artifact types.
//!
//! An [`Artifact`] is a typed, identified governance resource: a flat map of
//! attribute names to value lists plus optional lifecycle state. [`WebApp`] is
//! the typed view of artifacts of the web application type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::permissions::Visibility;
use crate::error::ArtifactError;

/// Media type of artifacts stored by the governance artifact directory.
pub const ARTIFACT_MEDIA_TYPE: &str = "application/vnd.appmig.artifact+json";

/// Artifact type of web applications.
pub const WEBAPP_ARTIFACT_TYPE: &str = "webapp";

/// Attribute keys of the web application overview.
pub mod attributes {
    /// Provider (owner) of the application.
    pub const PROVIDER: &str = "overview_provider";
    /// Application name.
    pub const NAME: &str = "overview_name";
    /// Application version.
    pub const VERSION: &str = "overview_version";
    /// Context path the application is served under.
    pub const CONTEXT: &str = "overview_context";
    /// Explicit visibility setting.
    pub const VISIBILITY: &str = "overview_visibility";
    /// Comma separated roles the application is visible to.
    pub const VISIBLE_ROLES: &str = "overview_visibleRoles";
}

/// A governance artifact.
///
/// # Examples
///
/// ```
/// use appmig_registry::types::Artifact;
///
/// let mut artifact = Artifact::with_id("app-1", "webapp");
/// artifact.set_attribute("overview_name", "Payroll");
/// artifact.add_attribute_value("overview_tags", "hr");
/// artifact.add_attribute_value("overview_tags", "finance");
///
/// assert_eq!(artifact.attribute("overview_name"), Some("Payroll"));
/// assert_eq!(artifact.attribute_values("overview_tags").len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    id: String,
    artifact_type: String,
    #[serde(default)]
    attributes: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lifecycle_state: Option<String>,
}

impl Artifact {
    /// Creates an artifact of the given type with a fresh ID.
    pub fn new(artifact_type: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), artifact_type)
    }

    /// Creates an artifact with a known ID.
    pub fn with_id(id: impl Into<String>, artifact_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            artifact_type: artifact_type.into(),
            attributes: BTreeMap::new(),
            lifecycle_state: None,
        }
    }

    /// Returns the artifact ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the artifact type.
    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    /// Returns the first value of an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns all values of an attribute.
    pub fn attribute_values(&self, key: &str) -> &[String] {
        self.attributes.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces an attribute with a single value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), vec![value.into()]);
    }

    /// Appends a value to an attribute.
    pub fn add_attribute_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.entry(key.into()).or_default().push(value.into());
    }

    /// Removes an attribute.
    pub fn remove_attribute(&mut self, key: &str) -> Option<Vec<String>> {
        self.attributes.remove(key)
    }

    /// Returns all attributes.
    pub fn attributes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.attributes
    }

    /// Returns the lifecycle state.
    pub fn lifecycle_state(&self) -> Option<&str> {
        self.lifecycle_state.as_deref()
    }

    /// Sets the lifecycle state.
    pub fn set_lifecycle_state(&mut self, state: impl Into<String>) {
        self.lifecycle_state = Some(state.into());
    }
}

/// A web application described by a governance artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebApp {
    /// Artifact ID backing the application.
    pub id: String,
    /// Provider (owner).
    pub provider: String,
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Context path.
    pub context: Option<String>,
    /// Visibility of the application.
    pub visibility: Visibility,
    /// Roles the application is visible to.
    pub visible_roles: Vec<String>,
    /// Lifecycle state.
    pub lifecycle_state: Option<String>,
}

impl TryFrom<&Artifact> for WebApp {
    type Error = ArtifactError;

    fn try_from(artifact: &Artifact) -> Result<Self, Self::Error> {
        let required = |key: &str| {
            artifact
                .attribute(key)
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| ArtifactError::Invalid {
                    id: artifact.id().to_string(),
                    message: format!("missing required attribute {}", key),
                })
        };

        if artifact.artifact_type() != WEBAPP_ARTIFACT_TYPE {
            return Err(ArtifactError::Invalid {
                id: artifact.id().to_string(),
                message: format!(
                    "expected artifact type {}, found {}",
                    WEBAPP_ARTIFACT_TYPE,
                    artifact.artifact_type()
                ),
            });
        }

        let visible_roles: Vec<String> = artifact
            .attribute(attributes::VISIBLE_ROLES)
            .map(|roles| {
                roles
                    .split(',')
                    .map(str::trim)
                    .filter(|role| !role.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let visibility = match artifact.attribute(attributes::VISIBILITY) {
            Some(value) => value.parse().map_err(|message| ArtifactError::Invalid {
                id: artifact.id().to_string(),
                message,
            })?,
            None if visible_roles.is_empty() => Visibility::Public,
            None => Visibility::Restricted,
        };

        Ok(WebApp {
            id: artifact.id().to_string(),
            provider: required(attributes::PROVIDER)?,
            name: required(attributes::NAME)?,
            version: required(attributes::VERSION)?,
            context: artifact.attribute(attributes::CONTEXT).map(str::to_string),
            visibility,
            visible_roles,
            lifecycle_state: artifact.lifecycle_state().map(str::to_string),
        })
    }
}
