//! Partition-backed governance artifact directory.
//!
//! [`GovernanceArtifactDirectory`] stores artifacts as JSON resources inside a
//! governance partition, one folder per artifact type:
//!
//! ```text
//! <artifact_root>/<artifact type>/<artifact id>
//! ```
//!
//! An artifact type has a manager only while its descriptor is stored at
//! [`RegistryLayout::descriptor_path`]. Without a descriptor, listing reports
//! "no manager" and writes are refused.

use async_trait::async_trait;
use tracing::debug;

use crate::core::{ArtifactDirectory, RegistryPartition};
use crate::error::{ArtifactError, RegistryResult};
use crate::layout::RegistryLayout;
use crate::types::{ARTIFACT_MEDIA_TYPE, Artifact, Resource};

/// Artifact directory over governance partitions.
#[derive(Debug, Clone, Default)]
pub struct GovernanceArtifactDirectory {
    layout: RegistryLayout,
}

impl GovernanceArtifactDirectory {
    /// Creates a directory using the given layout.
    pub fn new(layout: RegistryLayout) -> Self {
        Self { layout }
    }

    /// Returns the layout.
    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    /// Returns `true` if the registry holds a descriptor for the type.
    pub async fn has_manager(
        &self,
        registry: &dyn RegistryPartition,
        artifact_type: &str,
    ) -> RegistryResult<bool> {
        registry
            .exists(&self.layout.descriptor_path(artifact_type))
            .await
    }

    /// Stores a new artifact and returns its path.
    ///
    /// An existing artifact with the same ID is replaced.
    pub async fn add(
        &self,
        registry: &dyn RegistryPartition,
        artifact: &Artifact,
    ) -> RegistryResult<String> {
        self.require_manager(registry, artifact.artifact_type())
            .await?;

        let path = self
            .layout
            .artifact_path(artifact.artifact_type(), artifact.id());
        let content = serde_json::to_vec(artifact)?;
        registry
            .put(&path, Resource::new(content, Some(ARTIFACT_MEDIA_TYPE)))
            .await?;

        debug!(path = %path, "Stored governance artifact");
        Ok(path)
    }

    async fn require_manager(
        &self,
        registry: &dyn RegistryPartition,
        artifact_type: &str,
    ) -> RegistryResult<()> {
        if self.has_manager(registry, artifact_type).await? {
            Ok(())
        } else {
            Err(ArtifactError::ManagerUnavailable {
                artifact_type: artifact_type.to_string(),
            }
            .into())
        }
    }
}

#[async_trait]
impl ArtifactDirectory for GovernanceArtifactDirectory {
    async fn list_all(
        &self,
        registry: &dyn RegistryPartition,
        artifact_type: &str,
    ) -> RegistryResult<Option<Vec<Artifact>>> {
        if !self.has_manager(registry, artifact_type).await? {
            return Ok(None);
        }

        let folder = self.layout.artifact_folder(artifact_type);
        let mut artifacts = Vec::new();
        for path in registry.children(&folder).await? {
            let resource = registry.get(&path).await?;
            let artifact: Artifact = serde_json::from_slice(resource.content())?;
            artifacts.push(artifact);
        }

        Ok(Some(artifacts))
    }

    async fn update(
        &self,
        registry: &dyn RegistryPartition,
        artifact_type: &str,
        artifact: &Artifact,
    ) -> RegistryResult<()> {
        if artifact.artifact_type() != artifact_type {
            return Err(ArtifactError::Invalid {
                id: artifact.id().to_string(),
                message: format!(
                    "artifact of type {} cannot be updated as {}",
                    artifact.artifact_type(),
                    artifact_type
                ),
            }
            .into());
        }

        self.require_manager(registry, artifact_type).await?;

        let path = self.layout.artifact_path(artifact_type, artifact.id());
        if !registry.exists(&path).await? {
            return Err(ArtifactError::NotFound {
                artifact_type: artifact_type.to_string(),
                id: artifact.id().to_string(),
            }
            .into());
        }

        let mut resource = registry.get(&path).await?;
        resource.set_content(serde_json::to_vec(artifact)?);
        registry.put(&path, resource).await
    }

    async fn locate(
        &self,
        registry: &dyn RegistryPartition,
        artifact_id: &str,
    ) -> RegistryResult<String> {
        for folder in registry.children(&self.layout.artifact_root).await? {
            let candidate = format!("{}/{}", folder, artifact_id);
            if registry.exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(ArtifactError::NotLocated {
            id: artifact_id.to_string(),
        }
        .into())
    }
}
