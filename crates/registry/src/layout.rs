//! Registry path layout.
//!
//! [`RegistryLayout`] names the well-known locations the migration helper
//! reads and writes: where artifact descriptors live, where their UI
//! configuration templates live, where artifacts are stored, and where the
//! governance partition is mounted in the platform's absolute path space.

use serde::{Deserialize, Serialize};

/// Media type of artifact descriptors (RXT documents).
pub const DESCRIPTOR_MEDIA_TYPE: &str = "application/vnd.registry-ext-type+xml";

/// Well-known registry locations.
///
/// Every field has a default, so a partial JSON document deserializes into a
/// complete layout:
///
/// ```
/// use appmig_registry::RegistryLayout;
///
/// let layout: RegistryLayout =
///     serde_json::from_str(r#"{"artifact_root": "/apps"}"#).unwrap();
/// assert_eq!(layout.artifact_root, "/apps");
/// assert_eq!(layout.governance_base_path, "/_system/governance");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryLayout {
    /// Absolute path the governance partition is mounted at.
    #[serde(default = "default_governance_base_path")]
    pub governance_base_path: String,

    /// Governance-relative folder holding artifact descriptors.
    #[serde(default = "default_descriptor_root")]
    pub descriptor_root: String,

    /// Config-relative folder holding UI configuration templates.
    #[serde(default = "default_ui_config_root")]
    pub ui_config_root: String,

    /// Governance-relative folder holding artifacts, one subfolder per type.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: String,

    /// Media type written on descriptors.
    #[serde(default = "default_descriptor_media_type")]
    pub descriptor_media_type: String,

    /// Role granted read access to published descriptors.
    #[serde(default = "default_anonymous_role")]
    pub anonymous_role: String,
}

fn default_governance_base_path() -> String {
    "/_system/governance".to_string()
}

fn default_descriptor_root() -> String {
    "/repository/components/governance/types".to_string()
}

fn default_ui_config_root() -> String {
    "/repository/components/governance/configuration/".to_string()
}

fn default_artifact_root() -> String {
    "/appmgt/applicationdata/artifacts".to_string()
}

fn default_descriptor_media_type() -> String {
    DESCRIPTOR_MEDIA_TYPE.to_string()
}

fn default_anonymous_role() -> String {
    crate::types::ANONYMOUS_ROLE.to_string()
}

impl Default for RegistryLayout {
    fn default() -> Self {
        Self {
            governance_base_path: default_governance_base_path(),
            descriptor_root: default_descriptor_root(),
            ui_config_root: default_ui_config_root(),
            artifact_root: default_artifact_root(),
            descriptor_media_type: default_descriptor_media_type(),
            anonymous_role: default_anonymous_role(),
        }
    }
}

impl RegistryLayout {
    /// Governance-relative path of the descriptor for an artifact type.
    pub fn descriptor_path(&self, name: &str) -> String {
        format!("{}/{}.rxt", self.descriptor_root.trim_end_matches('/'), name)
    }

    /// Config-relative path of the UI configuration template of an artifact type.
    pub fn ui_config_path(&self, name: &str) -> String {
        format!("{}/{}", self.ui_config_root.trim_end_matches('/'), name)
    }

    /// Governance-relative folder holding artifacts of a type.
    pub fn artifact_folder(&self, artifact_type: &str) -> String {
        format!("{}/{}", self.artifact_root.trim_end_matches('/'), artifact_type)
    }

    /// Governance-relative path of an artifact.
    pub fn artifact_path(&self, artifact_type: &str, id: &str) -> String {
        format!("{}/{}", self.artifact_folder(artifact_type), id)
    }

    /// Absolute platform path of a governance-relative path.
    pub fn mounted_path(&self, governance_path: &str) -> String {
        format!(
            "{}{}",
            self.governance_base_path.trim_end_matches('/'),
            governance_path
        )
    }

    /// Validates the layout and returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let folders = [
            ("governance_base_path", &self.governance_base_path),
            ("descriptor_root", &self.descriptor_root),
            ("ui_config_root", &self.ui_config_root),
            ("artifact_root", &self.artifact_root),
        ];
        for (name, value) in folders {
            if !value.starts_with('/') {
                errors.push(format!("{} must be an absolute path, got {:?}", name, value));
            }
        }

        if self.descriptor_media_type.trim().is_empty() {
            errors.push("descriptor_media_type cannot be empty".to_string());
        }

        if self.anonymous_role.trim().is_empty() {
            errors.push("anonymous_role cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
