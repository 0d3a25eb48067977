//! Governance artifact directory abstraction.

use async_trait::async_trait;

use super::backend::RegistryPartition;
use crate::error::RegistryResult;
use crate::types::Artifact;

/// Typed access to the artifacts stored in a governance partition.
///
/// The directory is stateless with respect to tenants: every call receives the
/// partition handle it operates on.
#[async_trait]
pub trait ArtifactDirectory: Send + Sync {
    /// Lists all artifacts of a type.
    ///
    /// Returns `Ok(None)` if the registry has no manager for the type, which
    /// is distinct from a manager with no artifacts.
    async fn list_all(
        &self,
        registry: &dyn RegistryPartition,
        artifact_type: &str,
    ) -> RegistryResult<Option<Vec<Artifact>>>;

    /// Replaces a stored artifact of the given type.
    ///
    /// # Errors
    ///
    /// * `RegistryError::Artifact(ManagerUnavailable)` - if the type has no manager
    /// * `RegistryError::Artifact(NotFound)` - if the artifact is not stored
    /// * `RegistryError::Artifact(Invalid)` - if the artifact is of another type
    async fn update(
        &self,
        registry: &dyn RegistryPartition,
        artifact_type: &str,
        artifact: &Artifact,
    ) -> RegistryResult<()>;

    /// Returns the governance path of an artifact.
    ///
    /// # Errors
    ///
    /// * `RegistryError::Artifact(NotLocated)` - if no artifact has the ID
    async fn locate(
        &self,
        registry: &dyn RegistryPartition,
        artifact_id: &str,
    ) -> RegistryResult<String>;
}
