//! Registry resource types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ResourceError;

/// Media type of plain text resources.
pub const TEXT_MEDIA_TYPE: &str = "text/plain";

/// The logical registry partitions of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// Free-form configuration resources.
    Config,
    /// Structured governance artifacts and their descriptors.
    Governance,
}

impl PartitionKind {
    /// Returns the partition name as stored by backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Config => "config",
            PartitionKind::Governance => "governance",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "config" => Ok(PartitionKind::Config),
            "governance" | "gov" => Ok(PartitionKind::Governance),
            other => Err(format!("unknown registry partition: {}", other)),
        }
    }
}

/// A registry resource: opaque content with a media type and properties.
///
/// # Examples
///
/// ```
/// use appmig_registry::types::Resource;
///
/// let resource = Resource::new("v1", Some("text/plain")).with_property("owner", "admin");
/// assert_eq!(resource.content_str(), Some("v1"));
/// assert_eq!(resource.media_type(), Some("text/plain"));
/// assert_eq!(resource.property("owner"), Some("admin"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    content: Vec<u8>,
    media_type: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    last_modified: DateTime<Utc>,
}

impl Resource {
    /// Creates a resource with the given content and media type.
    pub fn new(content: impl Into<Vec<u8>>, media_type: Option<&str>) -> Self {
        Self {
            content: content.into(),
            media_type: media_type.map(str::to_string),
            properties: BTreeMap::new(),
            last_modified: Utc::now(),
        }
    }

    /// Reassembles a resource read back from storage.
    pub fn from_storage(
        content: Vec<u8>,
        media_type: Option<String>,
        properties: BTreeMap<String, String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            content,
            media_type,
            properties,
            last_modified,
        }
    }

    /// Adds a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the raw content.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the content as UTF-8 text, if it is valid UTF-8.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Consumes the resource and returns its content.
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// Replaces the content and touches the modification time.
    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) {
        self.content = content.into();
        self.last_modified = Utc::now();
    }

    /// Returns the media type.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Sets the media type.
    pub fn set_media_type(&mut self, media_type: impl Into<String>) {
        self.media_type = Some(media_type.into());
    }

    /// Returns a property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns all properties.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Returns when the resource was last modified.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}

/// Normalizes a registry path.
///
/// Paths are absolute (`/` separated, leading `/`). A trailing separator is
/// dropped, except for the root itself.
///
/// ```
/// use appmig_registry::types::normalize_path;
///
/// assert_eq!(normalize_path("/t/x/").unwrap(), "/t/x");
/// assert_eq!(normalize_path("/").unwrap(), "/");
/// assert!(normalize_path("t/x").is_err());
/// assert!(normalize_path("/t//x").is_err());
/// ```
pub fn normalize_path(path: &str) -> Result<String, ResourceError> {
    let invalid = || ResourceError::InvalidPath {
        path: path.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid());
    }

    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }
    if trimmed.contains("//") {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}

/// Returns the direct child of `parent` that contains `path`, if any.
///
/// Both arguments must be normalized.
pub fn child_of(parent: &str, path: &str) -> Option<String> {
    let prefix = if parent == "/" {
        "/".to_string()
    } else {
        format!("{}/", parent)
    };

    let rest = path.strip_prefix(&prefix)?;
    if rest.is_empty() {
        return None;
    }

    let segment = rest.split('/').next()?;
    Some(format!("{}{}", prefix, segment))
}
