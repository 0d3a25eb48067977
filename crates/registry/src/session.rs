//! Begin/end tenant flow façade.
//!
//! [`TenantRegistrySession`] keeps a "current tenant" between
//! [`start_tenant_flow`](TenantRegistrySession::start_tenant_flow) and
//! [`end_tenant_flow`](TenantRegistrySession::end_tenant_flow) and forwards
//! every operation to [`TenantRegistry`] with that tenant's context.
//!
//! ```text
//! NoSession --start_tenant_flow--> Active(tenant) --end_tenant_flow--> NoSession
//! ```
//!
//! Starting a flow while one is active fails. Ending a flow when none is
//! active does nothing. Every resource operation outside a flow fails with
//! [`SessionError::NotStarted`].
//!
//! A session is owned by one caller at a time (`&mut self` for the lifecycle
//! calls). Concurrent flows use one session each over a shared registry.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::descriptor::DescriptorPublication;
use crate::error::{RegistryResult, SessionError};
use crate::service::TenantRegistry;
use crate::tenant::{Tenant, TenantContext};
use crate::types::{Artifact, PartitionKind, QueryOutcome, Visibility, WebApp};

/// A registry session bound to at most one tenant flow at a time.
#[derive(Debug)]
pub struct TenantRegistrySession {
    registry: Arc<TenantRegistry>,
    flow: Option<TenantContext>,
}

impl TenantRegistrySession {
    /// Creates a session with no active flow.
    pub fn new(registry: Arc<TenantRegistry>) -> Self {
        Self {
            registry,
            flow: None,
        }
    }

    /// Returns the underlying registry service.
    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    /// Makes `tenant` the current tenant.
    ///
    /// # Errors
    ///
    /// * `SessionError::AlreadyActive` - if a flow is active; the active flow is kept
    pub fn start_tenant_flow(&mut self, tenant: Tenant) -> Result<(), SessionError> {
        if let Some(active) = &self.flow {
            warn!(
                active_domain = %active.domain(),
                requested_domain = %tenant.domain(),
                "Tenant flow start rejected, a flow is already active"
            );
            return Err(SessionError::AlreadyActive {
                tenant_id: active.tenant_id(),
                domain: active.domain().to_string(),
            });
        }

        self.flow = Some(self.registry.begin_flow(tenant));
        Ok(())
    }

    /// Ends the current flow, discarding the tenant and any cached provider.
    ///
    /// Does nothing when no flow is active.
    pub fn end_tenant_flow(&mut self) {
        if let Some(ctx) = self.flow.take() {
            debug!(tenant_domain = %ctx.domain(), "Ended tenant flow");
        }
    }

    /// Returns `true` while a flow is active.
    pub fn is_active(&self) -> bool {
        self.flow.is_some()
    }

    /// Returns the current tenant, if a flow is active.
    pub fn tenant(&self) -> Option<&Tenant> {
        self.flow.as_ref().map(TenantContext::tenant)
    }

    /// Returns the current flow's context.
    ///
    /// # Errors
    ///
    /// * `SessionError::NotStarted` - if no flow is active
    pub fn context(&self) -> Result<&TenantContext, SessionError> {
        self.flow.as_ref().ok_or(SessionError::NotStarted)
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Returns config content at `path`, or `None` if absent.
    pub async fn get_config_resource(&self, path: &str) -> RegistryResult<Option<Vec<u8>>> {
        let ctx = self.context()?;
        self.registry.get_config_resource(ctx, path).await
    }

    /// Returns governance content at `path`, or `None` if absent.
    pub async fn get_governance_resource(&self, path: &str) -> RegistryResult<Option<Vec<u8>>> {
        let ctx = self.context()?;
        self.registry.get_governance_resource(ctx, path).await
    }

    /// Checks whether a config resource exists at `path`.
    pub async fn config_resource_exists(&self, path: &str) -> RegistryResult<bool> {
        let ctx = self.context()?;
        self.registry.config_resource_exists(ctx, path).await
    }

    /// Checks whether a governance resource exists at `path`.
    pub async fn governance_resource_exists(&self, path: &str) -> RegistryResult<bool> {
        let ctx = self.context()?;
        self.registry.governance_resource_exists(ctx, path).await
    }

    /// Creates or overwrites a config resource.
    pub async fn put_config_resource(
        &self,
        path: &str,
        content: &[u8],
        media_type: &str,
    ) -> RegistryResult<()> {
        let ctx = self.context()?;
        self.registry
            .put_config_resource(ctx, path, content, media_type)
            .await
    }

    /// Creates or overwrites a governance resource.
    pub async fn put_governance_resource(
        &self,
        path: &str,
        content: &[u8],
        media_type: &str,
    ) -> RegistryResult<()> {
        let ctx = self.context()?;
        self.registry
            .put_governance_resource(ctx, path, content, media_type)
            .await
    }

    /// Replaces the content of an existing config resource.
    pub async fn update_config_resource(&self, path: &str, content: &[u8]) -> RegistryResult<()> {
        let ctx = self.context()?;
        self.registry.update_config_resource(ctx, path, content).await
    }

    /// Replaces the content of an existing governance resource.
    pub async fn update_governance_resource(
        &self,
        path: &str,
        content: &[u8],
    ) -> RegistryResult<()> {
        let ctx = self.context()?;
        self.registry
            .update_governance_resource(ctx, path, content)
            .await
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Opens a transaction on the config partition.
    pub async fn begin_config_transaction(&self) -> RegistryResult<()> {
        self.begin_transaction(PartitionKind::Config).await
    }

    /// Commits the open transaction on the config partition.
    pub async fn commit_config_transaction(&self) -> RegistryResult<()> {
        self.commit_transaction(PartitionKind::Config).await
    }

    /// Rolls back the open transaction on the config partition.
    pub async fn rollback_config_transaction(&self) -> RegistryResult<()> {
        self.rollback_transaction(PartitionKind::Config).await
    }

    /// Opens a transaction on the governance partition.
    pub async fn begin_governance_transaction(&self) -> RegistryResult<()> {
        self.begin_transaction(PartitionKind::Governance).await
    }

    /// Commits the open transaction on the governance partition.
    pub async fn commit_governance_transaction(&self) -> RegistryResult<()> {
        self.commit_transaction(PartitionKind::Governance).await
    }

    /// Rolls back the open transaction on the governance partition.
    pub async fn rollback_governance_transaction(&self) -> RegistryResult<()> {
        self.rollback_transaction(PartitionKind::Governance).await
    }

    async fn begin_transaction(&self, kind: PartitionKind) -> RegistryResult<()> {
        let ctx = self.context()?;
        self.registry.begin_transaction(ctx, kind).await
    }

    async fn commit_transaction(&self, kind: PartitionKind) -> RegistryResult<()> {
        let ctx = self.context()?;
        self.registry.commit_transaction(ctx, kind).await
    }

    async fn rollback_transaction(&self, kind: PartitionKind) -> RegistryResult<()> {
        let ctx = self.context()?;
        self.registry.rollback_transaction(ctx, kind).await
    }

    // ========================================================================
    // Artifacts, permissions and descriptors
    // ========================================================================

    /// Lists all artifacts of a type.
    ///
    /// Only a session violation is returned as an error; every other fault is
    /// reported as [`QueryOutcome::Failed`].
    pub async fn list_artifacts(
        &self,
        artifact_type: &str,
    ) -> RegistryResult<QueryOutcome<Vec<Artifact>>> {
        let ctx = self.context()?;
        Ok(self.registry.list_artifacts(ctx, artifact_type).await)
    }

    /// Updates artifacts in order and returns how many were applied.
    ///
    /// See [`TenantRegistry::update_artifacts`].
    pub async fn update_artifacts(
        &self,
        artifact_type: &str,
        artifacts: &[Artifact],
    ) -> RegistryResult<usize> {
        let ctx = self.context()?;
        Ok(self
            .registry
            .update_artifacts(ctx, artifact_type, artifacts)
            .await)
    }

    /// Returns the governance path of an artifact.
    pub async fn artifact_path(&self, artifact: &Artifact) -> RegistryResult<String> {
        let ctx = self.context()?;
        self.registry.artifact_path(ctx, artifact).await
    }

    /// Projects an artifact onto a web application, `None` if it is malformed.
    pub fn web_app(&self, artifact: &Artifact) -> RegistryResult<Option<WebApp>> {
        let ctx = self.context()?;
        Ok(self.registry.web_app(ctx, artifact))
    }

    /// Replaces the read permissions of a governance path.
    pub async fn set_resource_permissions(
        &self,
        visibility: Visibility,
        roles: &[String],
        path: &str,
    ) -> RegistryResult<()> {
        let ctx = self.context()?;
        self.registry
            .set_resource_permissions(ctx, visibility, roles, path)
            .await
    }

    /// Publishes an artifact descriptor.
    ///
    /// See [`TenantRegistry::publish_artifact_descriptor`].
    pub async fn publish_artifact_descriptor(
        &self,
        name: &str,
        payload: &str,
    ) -> RegistryResult<DescriptorPublication> {
        let ctx = self.context()?;
        self.registry
            .publish_artifact_descriptor(ctx, name, payload)
            .await
    }
}
