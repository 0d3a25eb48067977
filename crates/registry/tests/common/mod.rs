//! Test infrastructure for the registry layer.
//!
//! [`Harness`] wires a [`TenantRegistry`] to an in-memory platform wrapped in
//! [`FaultyPlatform`], which can be told to fail individual collaborator
//! calls. [`LogBuffer`] captures log output for assertions on failures that
//! are only reported through logging.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use appmig_registry::backends::memory::MemoryRegistry;
use appmig_registry::core::{
    ArtifactDirectory, Principal, ProviderFactory, RegistryBackend, RegistryPartition,
    ResourceProvider, TenantDirectory,
};
use appmig_registry::error::{ArtifactError, BackendError, IdentityError, RegistryResult};
use appmig_registry::governance::GovernanceArtifactDirectory;
use appmig_registry::tenant::{Tenant, TenantId};
use appmig_registry::types::{Action, Artifact, PartitionKind, Resource, attributes};
use appmig_registry::{RegistryLayout, TenantRegistry, TenantRegistrySession};

// ============================================================================
// Fixtures
// ============================================================================

/// Tenant 5, "acme".
pub fn acme() -> Tenant {
    Tenant::new(TenantId::new(5), "acme", "admin@acme")
}

/// Tenant 6, "globex".
pub fn globex() -> Tenant {
    Tenant::new(TenantId::new(6), "globex", "admin@globex")
}

/// A well-formed web application artifact.
pub fn webapp(id: &str, name: &str) -> Artifact {
    let mut artifact = Artifact::with_id(id, "webapp");
    artifact.set_attribute(attributes::PROVIDER, "admin");
    artifact.set_attribute(attributes::NAME, name);
    artifact.set_attribute(attributes::VERSION, "1.0.0");
    artifact.set_attribute(attributes::CONTEXT, format!("/{}", name));
    artifact
}

/// A minimal descriptor for the `webapp` type.
pub const WEBAPP_RXT: &str = r#"<artifactType type="application/vnd.appmig-webapp+xml" shortName="webapp">
    <storagePath>/appmgt/applicationdata/artifacts/webapp/@{overview_name}</storagePath>
    <content>
        <table name="Overview"><field type="text" required="true"><name>Name</name></field></table>
    </content>
</artifactType>"#;

// ============================================================================
// Fault injection
// ============================================================================

/// Switches for failing collaborator calls.
#[derive(Debug, Default)]
pub struct Faults {
    /// `resolve_admin_user` fails with a realm error.
    pub admin_lookup: AtomicBool,
    /// `open_partition` fails with a backend error.
    pub open_partition: AtomicBool,
    /// Artifact listing fails with a directory error.
    pub artifact_listing: AtomicBool,
    /// `authorize_role` fails with a backend error.
    pub authorize: AtomicBool,
    /// `put` fails on these partition paths.
    pub failing_puts: Mutex<Vec<String>>,
    /// Artifact updates fail for these IDs.
    pub failing_updates: Mutex<Vec<String>>,
    /// IDs of every artifact update attempted, in order.
    pub update_attempts: Mutex<Vec<String>>,
    /// Number of provider handles created.
    pub providers_created: AtomicUsize,
}

impl Faults {
    pub fn set(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    pub fn fail_put(&self, path: &str) {
        self.failing_puts.lock().push(path.to_string());
    }

    pub fn fail_update(&self, id: &str) {
        self.failing_updates.lock().push(id.to_string());
    }

    pub fn attempts(&self) -> Vec<String> {
        self.update_attempts.lock().clone()
    }

    pub fn providers_created(&self) -> usize {
        self.providers_created.load(Ordering::SeqCst)
    }
}

fn unavailable(message: &str) -> BackendError {
    BackendError::Unavailable {
        backend_name: "faulty".to_string(),
        message: message.to_string(),
    }
}

/// In-memory platform whose calls fail on demand.
pub struct FaultyPlatform {
    pub inner: MemoryRegistry,
    pub artifacts: GovernanceArtifactDirectory,
    pub faults: Arc<Faults>,
}

#[async_trait]
impl TenantDirectory for FaultyPlatform {
    async fn resolve_admin_user(&self, tenant_id: TenantId) -> RegistryResult<String> {
        if self.faults.admin_lookup.load(Ordering::SeqCst) {
            return Err(IdentityError::RealmUnavailable {
                tenant_id,
                message: "user store offline".to_string(),
            }
            .into());
        }
        self.inner.resolve_admin_user(tenant_id).await
    }

    async fn ensure_tenant_loaded(&self, tenant_id: TenantId) -> RegistryResult<()> {
        self.inner.ensure_tenant_loaded(tenant_id).await
    }

    async fn tenant_by_domain(&self, domain: &str) -> RegistryResult<Option<Tenant>> {
        self.inner.tenant_by_domain(domain).await
    }

    async fn list_tenants(&self) -> RegistryResult<Vec<Tenant>> {
        self.inner.list_tenants().await
    }

    async fn authorize_role(
        &self,
        tenant_id: TenantId,
        role: &str,
        path: &str,
        action: Action,
    ) -> RegistryResult<()> {
        if self.faults.authorize.load(Ordering::SeqCst) {
            return Err(unavailable("authorization manager offline").into());
        }
        self.inner.authorize_role(tenant_id, role, path, action).await
    }
}

#[async_trait]
impl RegistryBackend for FaultyPlatform {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    async fn open_partition(
        &self,
        kind: PartitionKind,
        principal: Principal,
        tenant_id: TenantId,
    ) -> RegistryResult<Arc<dyn RegistryPartition>> {
        if self.faults.open_partition.load(Ordering::SeqCst) {
            return Err(unavailable("registry offline").into());
        }
        let inner = self.inner.open_partition(kind, principal, tenant_id).await?;
        Ok(Arc::new(FaultyPartition {
            inner,
            faults: self.faults.clone(),
        }))
    }
}

#[async_trait]
impl ProviderFactory for FaultyPlatform {
    async fn provider(
        &self,
        tenant_id: TenantId,
        admin_name: &str,
    ) -> RegistryResult<Arc<dyn ResourceProvider>> {
        self.faults.providers_created.fetch_add(1, Ordering::SeqCst);
        self.inner.provider(tenant_id, admin_name).await
    }
}

#[async_trait]
impl ArtifactDirectory for FaultyPlatform {
    async fn list_all(
        &self,
        registry: &dyn RegistryPartition,
        artifact_type: &str,
    ) -> RegistryResult<Option<Vec<Artifact>>> {
        if self.faults.artifact_listing.load(Ordering::SeqCst) {
            return Err(ArtifactError::ManagerUnavailable {
                artifact_type: artifact_type.to_string(),
            }
            .into());
        }
        self.artifacts.list_all(registry, artifact_type).await
    }

    async fn update(
        &self,
        registry: &dyn RegistryPartition,
        artifact_type: &str,
        artifact: &Artifact,
    ) -> RegistryResult<()> {
        self.faults
            .update_attempts
            .lock()
            .push(artifact.id().to_string());
        if self.faults.failing_updates.lock().iter().any(|id| id == artifact.id()) {
            return Err(ArtifactError::Invalid {
                id: artifact.id().to_string(),
                message: "rejected by lifecycle".to_string(),
            }
            .into());
        }
        self.artifacts.update(registry, artifact_type, artifact).await
    }

    async fn locate(
        &self,
        registry: &dyn RegistryPartition,
        artifact_id: &str,
    ) -> RegistryResult<String> {
        self.artifacts.locate(registry, artifact_id).await
    }
}

/// Partition handle failing `put` on selected paths.
struct FaultyPartition {
    inner: Arc<dyn RegistryPartition>,
    faults: Arc<Faults>,
}

#[async_trait]
impl RegistryPartition for FaultyPartition {
    fn kind(&self) -> PartitionKind {
        self.inner.kind()
    }

    fn tenant_id(&self) -> TenantId {
        self.inner.tenant_id()
    }

    async fn exists(&self, path: &str) -> RegistryResult<bool> {
        self.inner.exists(path).await
    }

    async fn get(&self, path: &str) -> RegistryResult<Resource> {
        self.inner.get(path).await
    }

    async fn put(&self, path: &str, resource: Resource) -> RegistryResult<()> {
        if self.faults.failing_puts.lock().iter().any(|p| p == path) {
            return Err(unavailable("write rejected").into());
        }
        self.inner.put(path, resource).await
    }

    async fn children(&self, path: &str) -> RegistryResult<Vec<String>> {
        self.inner.children(path).await
    }

    async fn begin_transaction(&self) -> RegistryResult<()> {
        self.inner.begin_transaction().await
    }

    async fn commit_transaction(&self) -> RegistryResult<()> {
        self.inner.commit_transaction().await
    }

    async fn rollback_transaction(&self) -> RegistryResult<()> {
        self.inner.rollback_transaction().await
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A registry service over a faulty in-memory platform with acme and globex.
pub struct Harness {
    pub platform: MemoryRegistry,
    pub faults: Arc<Faults>,
    pub layout: RegistryLayout,
    pub registry: Arc<TenantRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        let platform = MemoryRegistry::new();
        platform.register_tenant(acme()).unwrap();
        platform.register_tenant(globex()).unwrap();

        let layout = RegistryLayout::default();
        let faults = Arc::new(Faults::default());
        let faulty = Arc::new(FaultyPlatform {
            inner: platform.clone(),
            artifacts: GovernanceArtifactDirectory::new(layout.clone()),
            faults: faults.clone(),
        });
        let registry = TenantRegistry::new(
            faulty.clone(),
            faulty.clone(),
            faulty.clone(),
            faulty,
            layout.clone(),
        );

        Self {
            platform,
            faults,
            layout,
            registry: Arc::new(registry),
        }
    }

    pub fn session(&self) -> TenantRegistrySession {
        TenantRegistrySession::new(self.registry.clone())
    }

    /// Opens a tenant partition as the platform itself.
    pub async fn system_partition(
        &self,
        tenant: &Tenant,
        kind: PartitionKind,
    ) -> Arc<dyn RegistryPartition> {
        self.platform
            .ensure_tenant_loaded(tenant.id())
            .await
            .unwrap();
        self.platform
            .open_partition(kind, Principal::System, tenant.id())
            .await
            .unwrap()
    }

    /// Installs the webapp descriptor and stores the given artifacts.
    pub async fn seed_webapps(&self, tenant: &Tenant, artifacts: &[Artifact]) {
        let governance = self.system_partition(tenant, PartitionKind::Governance).await;
        governance
            .put(
                &self.layout.descriptor_path("webapp"),
                Resource::new(WEBAPP_RXT, Some(self.layout.descriptor_media_type.as_str())),
            )
            .await
            .unwrap();

        let directory = GovernanceArtifactDirectory::new(self.layout.clone());
        for artifact in artifacts {
            directory.add(&*governance, artifact).await.unwrap();
        }
    }
}

// ============================================================================
// Log capture
// ============================================================================

/// Shared buffer collecting formatted log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Captures log output on the current thread until the guard is dropped.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
