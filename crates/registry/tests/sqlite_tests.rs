//! End-to-end tests over the SQLite platform.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use tempfile::TempDir;

use appmig_registry::backends::sqlite::SqliteRegistry;
use appmig_registry::core::TenantDirectory;
use appmig_registry::governance::GovernanceArtifactDirectory;
use appmig_registry::tenant::{Tenant, TenantId};
use appmig_registry::types::{Artifact, PartitionKind, Subject, Visibility, attributes};
use appmig_registry::{
    RegistryBackend, RegistryLayout, RegistryPartition, TenantRegistry, TenantRegistrySession,
};

fn acme() -> Tenant {
    Tenant::new(TenantId::new(5), "acme", "admin@acme")
}

fn globex() -> Tenant {
    Tenant::new(TenantId::new(6), "globex", "admin@globex")
}

fn create_sqlite_platform() -> SqliteRegistry {
    let platform = SqliteRegistry::in_memory().expect("Failed to create SQLite platform");
    platform.init_schema().expect("Failed to initialize schema");
    for tenant in [acme(), globex()] {
        platform
            .register_tenant(&tenant)
            .expect("Failed to register tenant");
    }
    platform
}

async fn flow_over(platform: &SqliteRegistry, tenant: Tenant) -> TenantRegistrySession {
    let mut session = session_over(platform.clone());
    session.start_tenant_flow(tenant).unwrap();
    session
}

fn session_over(platform: SqliteRegistry) -> TenantRegistrySession {
    let registry = TenantRegistry::from_platform(Arc::new(platform), RegistryLayout::default());
    TenantRegistrySession::new(Arc::new(registry))
}

// ============================================================================
// Flow over SQLite
// ============================================================================

/// The acme scenario runs unchanged over SQLite.
#[tokio::test]
async fn test_acme_scenario_sqlite() {
    let mut session = session_over(create_sqlite_platform());

    session.start_tenant_flow(acme()).unwrap();
    session
        .put_config_resource("/t/x", b"v1", "text/plain")
        .await
        .unwrap();
    assert_eq!(
        session.get_config_resource("/t/x").await.unwrap(),
        Some(b"v1".to_vec())
    );
    session.end_tenant_flow();

    assert!(session
        .get_config_resource("/t/x")
        .await
        .unwrap_err()
        .is_session_error());
}

/// Rolled back writes disappear; committed writes stay.
#[tokio::test]
async fn test_transactions_sqlite() {
    let mut session = session_over(create_sqlite_platform());
    session.start_tenant_flow(acme()).unwrap();

    session
        .put_config_resource("/t/x", b"v1", "text/plain")
        .await
        .unwrap();

    session.begin_config_transaction().await.unwrap();
    session.update_config_resource("/t/x", b"v2").await.unwrap();
    assert_eq!(
        session.get_config_resource("/t/x").await.unwrap(),
        Some(b"v2".to_vec())
    );
    session.rollback_config_transaction().await.unwrap();
    assert_eq!(
        session.get_config_resource("/t/x").await.unwrap(),
        Some(b"v1".to_vec())
    );

    session.begin_config_transaction().await.unwrap();
    session.update_config_resource("/t/x", b"v3").await.unwrap();
    session.commit_config_transaction().await.unwrap();
    assert_eq!(
        session.get_config_resource("/t/x").await.unwrap(),
        Some(b"v3".to_vec())
    );
}

/// Artifacts, permissions and descriptors work over SQLite.
#[tokio::test]
async fn test_artifacts_and_descriptors_sqlite() {
    let platform = create_sqlite_platform();
    let mut session = session_over(platform.clone());
    session.start_tenant_flow(acme()).unwrap();

    session
        .publish_artifact_descriptor("webapp", "<artifactType><content><table/></content></artifactType>")
        .await
        .unwrap();

    let governance = platform
        .open_governance_partition("admin@acme", TenantId::new(5))
        .await
        .unwrap();
    let mut artifact = Artifact::with_id("a1", "webapp");
    artifact.set_attribute(attributes::PROVIDER, "admin");
    artifact.set_attribute(attributes::NAME, "store");
    artifact.set_attribute(attributes::VERSION, "1.0");
    GovernanceArtifactDirectory::default()
        .add(&*governance, &artifact)
        .await
        .unwrap();

    let listed = session.list_artifacts("webapp").await.unwrap();
    assert_eq!(listed.items().len(), 1);

    artifact.set_lifecycle_state("Published");
    assert_eq!(
        session.update_artifacts("webapp", &[artifact.clone()]).await.unwrap(),
        1
    );

    let path = session.artifact_path(&artifact).await.unwrap();
    session
        .set_resource_permissions(Visibility::Private, &[], &path)
        .await
        .unwrap();

    let grants = platform.grants(TenantId::new(5)).unwrap();
    assert!(grants
        .iter()
        .any(|g| g.path == path && g.subject == Subject::User("admin@acme".to_string())));
    assert!(grants
        .iter()
        .any(|g| g.path.starts_with("/_system/governance/") && g.path.ends_with("webapp.rxt")));
}

// ============================================================================
// Transaction isolation
// ============================================================================

/// Rolling back one tenant's transaction keeps another tenant's writes.
#[tokio::test]
async fn test_rollback_keeps_other_tenant_writes_sqlite() {
    let platform = create_sqlite_platform();
    let acme_session = flow_over(&platform, acme()).await;
    let globex_session = flow_over(&platform, globex()).await;

    acme_session.begin_config_transaction().await.unwrap();
    acme_session
        .put_config_resource("/t/x", b"acme-data", "text/plain")
        .await
        .unwrap();
    globex_session
        .put_governance_resource("/g/x", b"globex-data", "text/plain")
        .await
        .unwrap();
    acme_session.rollback_config_transaction().await.unwrap();

    assert_eq!(acme_session.get_config_resource("/t/x").await.unwrap(), None);
    assert_eq!(
        globex_session.get_governance_resource("/g/x").await.unwrap(),
        Some(b"globex-data".to_vec())
    );
}

/// Rolling back the config partition keeps governance writes of the same tenant.
#[tokio::test]
async fn test_rollback_keeps_other_partition_writes_sqlite() {
    let platform = create_sqlite_platform();
    let session = flow_over(&platform, acme()).await;

    session.begin_config_transaction().await.unwrap();
    session
        .put_config_resource("/t/x", b"v1", "text/plain")
        .await
        .unwrap();
    session
        .put_governance_resource("/g/y", b"v1", "text/plain")
        .await
        .unwrap();
    session.rollback_config_transaction().await.unwrap();

    assert_eq!(session.get_config_resource("/t/x").await.unwrap(), None);
    assert_eq!(
        session.get_governance_resource("/g/y").await.unwrap(),
        Some(b"v1".to_vec())
    );
}

/// Two tenants hold open transactions at once and finish them independently.
#[tokio::test]
async fn test_concurrent_tenant_transactions_sqlite() {
    let platform = create_sqlite_platform();
    let acme_session = flow_over(&platform, acme()).await;
    let globex_session = flow_over(&platform, globex()).await;

    acme_session.begin_config_transaction().await.unwrap();
    globex_session.begin_config_transaction().await.unwrap();
    acme_session
        .put_config_resource("/t/x", b"acme", "text/plain")
        .await
        .unwrap();
    globex_session
        .put_config_resource("/t/x", b"globex", "text/plain")
        .await
        .unwrap();

    globex_session.commit_config_transaction().await.unwrap();
    acme_session.rollback_config_transaction().await.unwrap();

    assert_eq!(acme_session.get_config_resource("/t/x").await.unwrap(), None);
    assert_eq!(
        globex_session.get_config_resource("/t/x").await.unwrap(),
        Some(b"globex".to_vec())
    );
    assert!(globex_session.rollback_config_transaction().await.is_err());
}

// ============================================================================
// Persistence
// ============================================================================

/// Tenants, resources and grants survive reopening a file database.
#[tokio::test]
async fn test_file_database_persists() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("registry.db");

    {
        let platform = SqliteRegistry::open(&db_path).unwrap();
        platform.init_schema().unwrap();
        platform.register_tenant(&acme()).unwrap();

        let mut session = session_over(platform);
        session.start_tenant_flow(acme()).unwrap();
        session
            .put_governance_resource("/apps/a", b"{\"v\":1}", "application/json")
            .await
            .unwrap();
        session
            .set_resource_permissions(Visibility::Public, &[], "/apps/a")
            .await
            .unwrap();
    }

    let platform = SqliteRegistry::open(&db_path).unwrap();
    platform.init_schema().unwrap();

    let tenants = platform.list_tenants().await.unwrap();
    assert_eq!(tenants, vec![acme()]);
    assert!(platform.is_loaded(TenantId::new(5)).unwrap());
    assert_eq!(platform.grants(TenantId::new(5)).unwrap().len(), 2);

    let governance = platform
        .open_partition(
            PartitionKind::Governance,
            appmig_registry::core::Principal::System,
            TenantId::new(5),
        )
        .await
        .unwrap();
    let resource = governance.get("/apps/a").await.unwrap();
    assert_eq!(resource.content(), b"{\"v\":1}");
    assert_eq!(resource.media_type(), Some("application/json"));
}
