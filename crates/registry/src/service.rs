//! Explicit-context registry service.
//!
//! [`TenantRegistry`] performs every registry operation on behalf of the
//! tenant named by a [`TenantContext`]. It holds no per-tenant state, so one
//! instance serves any number of concurrent flows.
//!
//! # Failure semantics
//!
//! - Mutating operations propagate every fault.
//! - Artifact listing, batch artifact updates and web application projection
//!   log faults at error level with the tenant's domain and ID, then degrade.
//! - Nothing is retried.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::core::{
    ArtifactDirectory, Principal, ProviderFactory, RegistryBackend, RegistryPartition,
    TenantDirectory,
};
use crate::descriptor::{self, DescriptorPublication};
use crate::error::{IdentityError, RegistryError, RegistryResult};
use crate::governance::GovernanceArtifactDirectory;
use crate::layout::RegistryLayout;
use crate::tenant::{Tenant, TenantContext};
use crate::types::{
    Action, Artifact, PartitionKind, QueryOutcome, Resource, Visibility, WebApp,
};

/// Registry operations scoped by an explicit tenant context.
pub struct TenantRegistry {
    directory: Arc<dyn TenantDirectory>,
    backend: Arc<dyn RegistryBackend>,
    artifacts: Arc<dyn ArtifactDirectory>,
    providers: Arc<dyn ProviderFactory>,
    layout: RegistryLayout,
}

impl std::fmt::Debug for TenantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantRegistry")
            .field("backend", &self.backend.backend_name())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl TenantRegistry {
    /// Creates a registry service from its collaborators.
    ///
    /// `layout` places descriptors and UI templates, so it must be the layout
    /// `artifacts` resolves artifact folders with.
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        backend: Arc<dyn RegistryBackend>,
        artifacts: Arc<dyn ArtifactDirectory>,
        providers: Arc<dyn ProviderFactory>,
        layout: RegistryLayout,
    ) -> Self {
        Self {
            directory,
            backend,
            artifacts,
            providers,
            layout,
        }
    }

    /// Creates a registry service over a platform that provides the tenant
    /// directory, the backend and the provider factory, with a governance
    /// artifact directory using the same layout.
    pub fn from_platform<P>(platform: Arc<P>, layout: RegistryLayout) -> Self
    where
        P: TenantDirectory + RegistryBackend + ProviderFactory + 'static,
    {
        Self {
            directory: platform.clone(),
            backend: platform.clone(),
            artifacts: Arc::new(GovernanceArtifactDirectory::new(layout.clone())),
            providers: platform,
            layout,
        }
    }

    /// Returns the layout.
    pub fn layout(&self) -> &RegistryLayout {
        &self.layout
    }

    /// Returns the tenant directory.
    pub fn directory(&self) -> &Arc<dyn TenantDirectory> {
        &self.directory
    }

    /// Starts a flow for the tenant.
    pub fn begin_flow(&self, tenant: Tenant) -> TenantContext {
        info!(
            tenant_domain = %tenant.domain(),
            tenant_id = %tenant.id(),
            "Started tenant flow"
        );
        TenantContext::new(tenant)
    }

    /// Resolves a tenant by domain.
    pub async fn tenant_by_domain(&self, domain: &str) -> RegistryResult<Tenant> {
        self.directory
            .tenant_by_domain(domain)
            .await?
            .ok_or_else(|| {
                IdentityError::TenantNotFound {
                    tenant: domain.to_string(),
                }
                .into()
            })
    }

    /// Lists all tenants.
    pub async fn list_tenants(&self) -> RegistryResult<Vec<Tenant>> {
        self.directory.list_tenants().await
    }

    // ========================================================================
    // Partitions
    // ========================================================================

    async fn user_partition(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
    ) -> RegistryResult<Arc<dyn RegistryPartition>> {
        let tenant_id = ctx.tenant_id();
        let admin = self.directory.resolve_admin_user(tenant_id).await?;
        debug!(
            tenant_domain = %ctx.domain(),
            admin = %admin,
            "Tenant admin username"
        );
        self.directory.ensure_tenant_loaded(tenant_id).await?;
        self.backend
            .open_partition(kind, Principal::User(admin), tenant_id)
            .await
    }

    async fn system_partition(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
    ) -> RegistryResult<Arc<dyn RegistryPartition>> {
        self.directory.ensure_tenant_loaded(ctx.tenant_id()).await?;
        self.backend
            .open_partition(kind, Principal::System, ctx.tenant_id())
            .await
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Returns the content at `path`, or `None` if nothing is stored there.
    pub async fn get_resource(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
        path: &str,
    ) -> RegistryResult<Option<Vec<u8>>> {
        let registry = self.user_partition(ctx, kind).await?;
        if registry.exists(path).await? {
            let resource = registry.get(path).await?;
            Ok(Some(resource.into_content()))
        } else {
            Ok(None)
        }
    }

    /// Returns config content at `path`, or `None` if absent.
    pub async fn get_config_resource(
        &self,
        ctx: &TenantContext,
        path: &str,
    ) -> RegistryResult<Option<Vec<u8>>> {
        self.get_resource(ctx, PartitionKind::Config, path).await
    }

    /// Returns governance content at `path`, or `None` if absent.
    pub async fn get_governance_resource(
        &self,
        ctx: &TenantContext,
        path: &str,
    ) -> RegistryResult<Option<Vec<u8>>> {
        self.get_resource(ctx, PartitionKind::Governance, path).await
    }

    /// Checks whether a resource exists at `path`.
    pub async fn resource_exists(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
        path: &str,
    ) -> RegistryResult<bool> {
        self.user_partition(ctx, kind).await?.exists(path).await
    }

    /// Checks whether a config resource exists at `path`.
    pub async fn config_resource_exists(
        &self,
        ctx: &TenantContext,
        path: &str,
    ) -> RegistryResult<bool> {
        self.resource_exists(ctx, PartitionKind::Config, path).await
    }

    /// Checks whether a governance resource exists at `path`.
    pub async fn governance_resource_exists(
        &self,
        ctx: &TenantContext,
        path: &str,
    ) -> RegistryResult<bool> {
        self.resource_exists(ctx, PartitionKind::Governance, path)
            .await
    }

    /// Creates or overwrites the resource at `path`.
    pub async fn put_resource(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
        path: &str,
        content: &[u8],
        media_type: &str,
    ) -> RegistryResult<()> {
        let registry = self.user_partition(ctx, kind).await?;
        registry
            .put(path, Resource::new(content, Some(media_type)))
            .await
    }

    /// Creates or overwrites a config resource.
    pub async fn put_config_resource(
        &self,
        ctx: &TenantContext,
        path: &str,
        content: &[u8],
        media_type: &str,
    ) -> RegistryResult<()> {
        self.put_resource(ctx, PartitionKind::Config, path, content, media_type)
            .await
    }

    /// Creates or overwrites a governance resource.
    pub async fn put_governance_resource(
        &self,
        ctx: &TenantContext,
        path: &str,
        content: &[u8],
        media_type: &str,
    ) -> RegistryResult<()> {
        self.put_resource(ctx, PartitionKind::Governance, path, content, media_type)
            .await
    }

    /// Replaces the content of an existing resource, keeping its media type
    /// and properties.
    ///
    /// # Errors
    ///
    /// * `RegistryError::Resource(NotFound)` - if nothing is stored at `path`
    pub async fn update_resource(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
        path: &str,
        content: &[u8],
    ) -> RegistryResult<()> {
        let registry = self.user_partition(ctx, kind).await?;
        let mut resource = registry.get(path).await?;
        resource.set_content(content);
        registry.put(path, resource).await
    }

    /// Replaces the content of an existing config resource.
    pub async fn update_config_resource(
        &self,
        ctx: &TenantContext,
        path: &str,
        content: &[u8],
    ) -> RegistryResult<()> {
        self.update_resource(ctx, PartitionKind::Config, path, content)
            .await
    }

    /// Replaces the content of an existing governance resource.
    pub async fn update_governance_resource(
        &self,
        ctx: &TenantContext,
        path: &str,
        content: &[u8],
    ) -> RegistryResult<()> {
        self.update_resource(ctx, PartitionKind::Governance, path, content)
            .await
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Opens a transaction on one of the tenant's partitions.
    pub async fn begin_transaction(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
    ) -> RegistryResult<()> {
        self.user_partition(ctx, kind)
            .await?
            .begin_transaction()
            .await
    }

    /// Commits the open transaction on one of the tenant's partitions.
    pub async fn commit_transaction(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
    ) -> RegistryResult<()> {
        self.user_partition(ctx, kind)
            .await?
            .commit_transaction()
            .await
    }

    /// Rolls back the open transaction on one of the tenant's partitions.
    pub async fn rollback_transaction(
        &self,
        ctx: &TenantContext,
        kind: PartitionKind,
    ) -> RegistryResult<()> {
        warn!(
            tenant_domain = %ctx.domain(),
            tenant_id = %ctx.tenant_id(),
            partition = %kind,
            "Rolling back registry transaction"
        );
        self.user_partition(ctx, kind)
            .await?
            .rollback_transaction()
            .await
    }

    // ========================================================================
    // Artifacts
    // ========================================================================

    /// Lists all artifacts of a type.
    ///
    /// Never fails: directory, backend and identity faults are logged and
    /// reported as [`QueryOutcome::Failed`].
    pub async fn list_artifacts(
        &self,
        ctx: &TenantContext,
        artifact_type: &str,
    ) -> QueryOutcome<Vec<Artifact>> {
        let listed = async {
            let registry = self.user_partition(ctx, PartitionKind::Governance).await?;
            self.artifacts.list_all(&*registry, artifact_type).await
        }
        .await;

        match listed {
            Ok(Some(artifacts)) => QueryOutcome::from_items(artifacts),
            Ok(None) => {
                debug!(
                    tenant_domain = %ctx.domain(),
                    tenant_id = %ctx.tenant_id(),
                    artifact_type,
                    "No artifacts of this type found in registry"
                );
                QueryOutcome::Empty
            }
            Err(err) => {
                log_artifact_failure(ctx, artifact_type, "retrieving", &err);
                QueryOutcome::Failed(err)
            }
        }
    }

    /// Updates artifacts in order and returns how many were applied.
    ///
    /// Stops at the first failure. The failure is logged, earlier updates are
    /// kept and later artifacts are not attempted.
    pub async fn update_artifacts(
        &self,
        ctx: &TenantContext,
        artifact_type: &str,
        artifacts: &[Artifact],
    ) -> usize {
        let registry = match self.user_partition(ctx, PartitionKind::Governance).await {
            Ok(registry) => registry,
            Err(err) => {
                log_artifact_failure(ctx, artifact_type, "updating", &err);
                return 0;
            }
        };

        let mut applied = 0;
        for artifact in artifacts {
            if let Err(err) = self
                .artifacts
                .update(&*registry, artifact_type, artifact)
                .await
            {
                error!(
                    artifact_id = %artifact.id(),
                    remaining = artifacts.len() - applied - 1,
                    "Artifact update failed, skipping the rest of the batch"
                );
                log_artifact_failure(ctx, artifact_type, "updating", &err);
                break;
            }
            applied += 1;
        }

        debug!(
            tenant_domain = %ctx.domain(),
            artifact_type,
            applied,
            total = artifacts.len(),
            "Artifact batch update finished"
        );
        applied
    }

    /// Returns the governance path of an artifact.
    pub async fn artifact_path(
        &self,
        ctx: &TenantContext,
        artifact: &Artifact,
    ) -> RegistryResult<String> {
        let registry = self.user_partition(ctx, PartitionKind::Governance).await?;
        self.artifacts.locate(&*registry, artifact.id()).await
    }

    /// Projects an artifact onto a web application.
    ///
    /// Malformed artifacts are logged and yield `None`.
    pub fn web_app(&self, ctx: &TenantContext, artifact: &Artifact) -> Option<WebApp> {
        match WebApp::try_from(artifact) {
            Ok(app) => Some(app),
            Err(err) => {
                error!(
                    tenant_domain = %ctx.domain(),
                    tenant_id = %ctx.tenant_id(),
                    artifact_id = %artifact.id(),
                    error = %err,
                    "Error when getting web application from artifact"
                );
                None
            }
        }
    }

    // ========================================================================
    // Permissions and descriptors
    // ========================================================================

    /// Replaces the read permissions of a governance path.
    ///
    /// The provider handle for the tenant admin is resolved on first use and
    /// cached in the context for the rest of the flow.
    pub async fn set_resource_permissions(
        &self,
        ctx: &TenantContext,
        visibility: Visibility,
        roles: &[String],
        path: &str,
    ) -> RegistryResult<()> {
        let provider = ctx
            .provider_or_init(|| async move {
                debug!(admin = %ctx.admin_name(), "Resolving provider for tenant admin");
                self.providers
                    .provider(ctx.tenant_id(), ctx.admin_name())
                    .await
            })
            .await?;

        provider
            .set_resource_permissions(visibility, roles, path)
            .await
    }

    /// Publishes an artifact descriptor.
    ///
    /// Writes the descriptor into the governance partition and grants the
    /// anonymous role read access to it. Then, independently, refreshes the
    /// type's UI configuration if a template exists; a missing template is
    /// skipped. A failed descriptor write skips the grant but not the UI
    /// refresh. The first error is returned.
    pub async fn publish_artifact_descriptor(
        &self,
        ctx: &TenantContext,
        name: &str,
        payload: &str,
    ) -> RegistryResult<DescriptorPublication> {
        descriptor::validate_name(name)?;

        let descriptor_path = self.layout.descriptor_path(name);
        let mounted_path = self.layout.mounted_path(&descriptor_path);

        let descriptor_written = self
            .write_descriptor(ctx, &descriptor_path, &mounted_path, payload)
            .await;
        let ui_refreshed = self.refresh_ui_config(ctx, name, payload).await;

        match (descriptor_written, ui_refreshed) {
            (Ok(()), Ok(ui_config_updated)) => {
                info!(
                    tenant_domain = %ctx.domain(),
                    tenant_id = %ctx.tenant_id(),
                    descriptor = name,
                    ui_config_updated,
                    "Published artifact descriptor"
                );
                Ok(DescriptorPublication {
                    descriptor_path,
                    mounted_path,
                    ui_config_updated,
                })
            }
            (Err(err), ui_refreshed) => {
                if let Err(ui_err) = ui_refreshed {
                    error!(
                        tenant_domain = %ctx.domain(),
                        descriptor = name,
                        error = %ui_err,
                        "UI configuration refresh also failed"
                    );
                }
                Err(err)
            }
            (Ok(()), Err(err)) => Err(err),
        }
    }

    async fn write_descriptor(
        &self,
        ctx: &TenantContext,
        descriptor_path: &str,
        mounted_path: &str,
        payload: &str,
    ) -> RegistryResult<()> {
        let registry = self
            .system_partition(ctx, PartitionKind::Governance)
            .await?;

        let mut resource = if registry.exists(descriptor_path).await? {
            registry.get(descriptor_path).await?
        } else {
            Resource::new(Vec::new(), None)
        };
        resource.set_content(payload.as_bytes());
        resource.set_media_type(self.layout.descriptor_media_type.as_str());
        registry.put(descriptor_path, resource).await?;

        self.directory
            .authorize_role(
                ctx.tenant_id(),
                &self.layout.anonymous_role,
                mounted_path,
                Action::Get,
            )
            .await
    }

    async fn refresh_ui_config(
        &self,
        ctx: &TenantContext,
        name: &str,
        payload: &str,
    ) -> RegistryResult<bool> {
        let registry = self.system_partition(ctx, PartitionKind::Config).await?;
        let ui_config_path = self.layout.ui_config_path(name);

        if !registry.exists(&ui_config_path).await? {
            debug!(
                tenant_domain = %ctx.domain(),
                path = %ui_config_path,
                "No UI configuration template, skipping"
            );
            return Ok(false);
        }

        let projection = descriptor::ui_projection(name, payload)?;
        let mut resource = registry.get(&ui_config_path).await?;
        resource.set_content(projection);
        registry.put(&ui_config_path, resource).await?;
        Ok(true)
    }
}

fn log_artifact_failure(
    ctx: &TenantContext,
    artifact_type: &str,
    operation: &str,
    err: &RegistryError,
) {
    match err {
        RegistryError::Identity(_) => error!(
            tenant_domain = %ctx.domain(),
            tenant_id = %ctx.tenant_id(),
            error = %err,
            "Error occurred while obtaining information regarding tenant"
        ),
        RegistryError::Artifact(_) => error!(
            tenant_domain = %ctx.domain(),
            tenant_id = %ctx.tenant_id(),
            artifact_type,
            error = %err,
            "Artifact directory failed for {} artifacts",
            artifact_type
        ),
        _ => error!(
            tenant_domain = %ctx.domain(),
            tenant_id = %ctx.tenant_id(),
            artifact_type,
            error = %err,
            "Error occurred when {} {} artifacts in registry",
            operation,
            artifact_type
        ),
    }
}
