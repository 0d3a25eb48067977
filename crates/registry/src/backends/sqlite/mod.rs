//! SQLite registry platform.
//!
//! This module provides a SQLite implementation of the platform traits. It
//! supports both in-memory databases (for tests and dry runs) and file-based
//! databases that persist tenants, partitions and permission grants across
//! migration runs.
//!
//! # Example
//!
//! ```no_run
//! use appmig_registry::backends::sqlite::SqliteRegistry;
//! use appmig_registry::tenant::{Tenant, TenantId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = SqliteRegistry::open("./data/registry.db")?;
//! platform.init_schema()?;
//! platform.register_tenant(&Tenant::new(TenantId::new(5), "acme", "admin@acme"))?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tenants (
//!     id INTEGER PRIMARY KEY,
//!     domain TEXT NOT NULL UNIQUE,
//!     admin_name TEXT NOT NULL,
//!     loaded INTEGER NOT NULL DEFAULT 0,
//!     created_at TEXT NOT NULL
//! );
//!
//! CREATE TABLE resources (
//!     tenant_id INTEGER NOT NULL,
//!     partition TEXT NOT NULL,      -- 'config' or 'governance'
//!     path TEXT NOT NULL,
//!     content BLOB NOT NULL,
//!     media_type TEXT,
//!     properties TEXT NOT NULL,     -- JSON object
//!     last_modified TEXT NOT NULL,
//!     PRIMARY KEY (tenant_id, partition, path)
//! );
//!
//! -- Partition contents as of an open partition transaction's begin
//! CREATE TABLE resource_snapshots (
//!     tenant_id INTEGER NOT NULL,
//!     partition TEXT NOT NULL,
//!     path TEXT NOT NULL,
//!     content BLOB NOT NULL,
//!     media_type TEXT,
//!     properties TEXT NOT NULL,
//!     last_modified TEXT NOT NULL,
//!     PRIMARY KEY (tenant_id, partition, path)
//! );
//!
//! CREATE TABLE permissions (
//!     tenant_id INTEGER NOT NULL,
//!     subject_kind TEXT NOT NULL,   -- 'role' or 'user'
//!     subject_name TEXT NOT NULL,
//!     path TEXT NOT NULL,
//!     action TEXT NOT NULL,
//!     PRIMARY KEY (tenant_id, subject_kind, subject_name, path, action)
//! );
//! ```

mod backend;
mod directory;
mod partition;
mod schema;

pub use backend::{SqliteRegistry, SqliteRegistryConfig};
pub use partition::SqlitePartition;
pub use schema::SCHEMA_VERSION;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Principal, ProviderFactory, RegistryBackend, RegistryPartition, ResourceProvider,
        TenantDirectory,
    };
    use crate::error::{BackendError, IdentityError, RegistryError};
    use crate::tenant::{Tenant, TenantId};
    use crate::types::{Action, PartitionKind, Resource, Subject, Visibility};

    fn platform() -> SqliteRegistry {
        let platform = SqliteRegistry::in_memory().unwrap();
        platform.init_schema().unwrap();
        platform
            .register_tenant(&Tenant::new(TenantId::new(5), "acme", "admin@acme"))
            .unwrap();
        platform
    }

    #[test]
    fn test_in_memory_mode() {
        let platform = SqliteRegistry::in_memory().unwrap();
        assert!(platform.is_memory());
        assert!(platform.init_schema().is_ok());
    }

    #[test]
    fn test_config_defaults() {
        let config: SqliteRegistryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SqliteRegistryConfig::default());
        assert_eq!(config.max_connections, 4);
        assert!(config.enable_wal);
    }

    #[tokio::test]
    async fn test_tenant_directory() {
        let platform = platform();
        let tenant_id = TenantId::new(5);

        assert_eq!(platform.resolve_admin_user(tenant_id).await.unwrap(), "admin@acme");
        assert!(!platform.is_loaded(tenant_id).unwrap());
        platform.ensure_tenant_loaded(tenant_id).await.unwrap();
        platform.ensure_tenant_loaded(tenant_id).await.unwrap();
        assert!(platform.is_loaded(tenant_id).unwrap());

        let acme = platform.tenant_by_domain("acme").await.unwrap().unwrap();
        assert_eq!(acme.id(), tenant_id);
        assert!(platform.tenant_by_domain("globex").await.unwrap().is_none());

        let err = platform
            .ensure_tenant_loaded(TenantId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Identity(IdentityError::TenantNotFound { .. })
        ));
    }

    #[test]
    fn test_pool_timeout_is_pool_exhausted() {
        let config = SqliteRegistryConfig {
            connection_timeout_ms: 50,
            ..Default::default()
        };
        let platform = SqliteRegistry::with_config(":memory:", config).unwrap();

        let _held = platform.get_connection().unwrap();
        let err = platform.get_connection().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Backend(BackendError::PoolExhausted { .. })
        ));
    }

    #[test]
    fn test_register_rejects_duplicate_domain() {
        let platform = platform();

        let err = platform
            .register_tenant(&Tenant::new(TenantId::new(6), "acme", "admin@other"))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Identity(IdentityError::DuplicateDomain { tenant_id, .. })
                if tenant_id == TenantId::new(5)
        ));
        assert!(!platform.is_loaded(TenantId::new(6)).unwrap());

        // Re-registering the owner of the domain is an update.
        platform
            .register_tenant(&Tenant::new(TenantId::new(5), "acme", "admin@acme"))
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_keeps_loaded_state() {
        let platform = platform();
        let tenant_id = TenantId::new(5);
        platform.ensure_tenant_loaded(tenant_id).await.unwrap();

        platform
            .register_tenant(&Tenant::new(tenant_id, "acme", "root@acme"))
            .unwrap();
        assert!(platform.is_loaded(tenant_id).unwrap());
        assert_eq!(platform.resolve_admin_user(tenant_id).await.unwrap(), "root@acme");
    }

    #[tokio::test]
    async fn test_open_partition_checks() {
        let platform = platform();
        let tenant_id = TenantId::new(5);

        let err = platform
            .open_partition(PartitionKind::Config, Principal::System, tenant_id)
            .await
            .err().expect("expected error");
        assert!(matches!(
            err,
            RegistryError::Backend(BackendError::TenantNotLoaded { .. })
        ));

        platform.ensure_tenant_loaded(tenant_id).await.unwrap();
        let err = platform
            .open_config_partition("mallory", tenant_id)
            .await
            .err().expect("expected error");
        assert!(matches!(
            err,
            RegistryError::Identity(IdentityError::PrincipalRejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_resource_crud() {
        let platform = platform();
        let tenant_id = TenantId::new(5);
        platform.ensure_tenant_loaded(tenant_id).await.unwrap();
        let registry = platform
            .open_config_partition("admin@acme", tenant_id)
            .await
            .unwrap();

        assert!(!registry.exists("/t/x").await.unwrap());
        let err = registry.get("/t/x").await.unwrap_err();
        assert!(err.is_not_found());

        let resource = Resource::new("v1", Some("text/plain")).with_property("owner", "admin");
        registry.put("/t/x", resource).await.unwrap();

        let stored = registry.get("/t/x/").await.unwrap();
        assert_eq!(stored.content(), b"v1");
        assert_eq!(stored.media_type(), Some("text/plain"));
        assert_eq!(stored.property("owner"), Some("admin"));

        let mut updated = stored.clone();
        updated.set_content("v2");
        registry.put("/t/x", updated).await.unwrap();
        assert_eq!(registry.get("/t/x").await.unwrap().content(), b"v2");

        let governance = platform
            .open_governance_partition("admin@acme", tenant_id)
            .await
            .unwrap();
        assert!(!governance.exists("/t/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_children_include_implicit_folders() {
        let platform = platform();
        let tenant_id = TenantId::new(5);
        platform.ensure_tenant_loaded(tenant_id).await.unwrap();
        let registry = platform
            .open_governance_partition("admin@acme", tenant_id)
            .await
            .unwrap();

        for path in ["/_a/webapp/1", "/_a/webapp/2", "/_a/mobile/3", "/_ab/x"] {
            registry.put(path, Resource::new("{}", None)).await.unwrap();
        }

        assert_eq!(
            registry.children("/_a").await.unwrap(),
            vec!["/_a/mobile", "/_a/webapp"]
        );
        assert_eq!(
            registry.children("/_a/webapp").await.unwrap(),
            vec!["/_a/webapp/1", "/_a/webapp/2"]
        );
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let platform = platform();
        let tenant_id = TenantId::new(5);
        platform.ensure_tenant_loaded(tenant_id).await.unwrap();
        let registry = platform
            .open_config_partition("admin@acme", tenant_id)
            .await
            .unwrap();

        registry.put("/t/keep", Resource::new("v0", None)).await.unwrap();

        registry.begin_transaction().await.unwrap();
        registry.put("/t/x", Resource::new("v1", None)).await.unwrap();
        registry.put("/t/keep", Resource::new("v1", None)).await.unwrap();
        assert!(registry.exists("/t/x").await.unwrap());

        let err = registry.begin_transaction().await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Backend(BackendError::TransactionActive { .. })
        ));

        registry.rollback_transaction().await.unwrap();
        assert!(!registry.exists("/t/x").await.unwrap());
        assert_eq!(registry.get("/t/keep").await.unwrap().content(), b"v0");
        assert!(registry.rollback_transaction().await.is_err());
    }

    #[tokio::test]
    async fn test_transaction_commit_and_ownership() {
        let platform = platform();
        let tenant_id = TenantId::new(5);
        platform.ensure_tenant_loaded(tenant_id).await.unwrap();
        let config = platform
            .open_config_partition("admin@acme", tenant_id)
            .await
            .unwrap();
        let governance = platform
            .open_governance_partition("admin@acme", tenant_id)
            .await
            .unwrap();

        config.begin_transaction().await.unwrap();
        config.put("/t/x", Resource::new("v1", None)).await.unwrap();

        let err = governance.commit_transaction().await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Backend(BackendError::NoTransaction { .. })
        ));

        // The governance partition transacts independently of config.
        governance.begin_transaction().await.unwrap();
        governance.put("/g/y", Resource::new("v1", None)).await.unwrap();
        governance.rollback_transaction().await.unwrap();
        assert!(!governance.exists("/g/y").await.unwrap());

        config.commit_transaction().await.unwrap();
        assert!(config.exists("/t/x").await.unwrap());
        assert!(config.commit_transaction().await.is_err());
    }

    #[tokio::test]
    async fn test_permissions() {
        let platform = platform();
        let tenant_id = TenantId::new(5);

        platform
            .authorize_role(tenant_id, "system/anonymous", "/gov/a.rxt", Action::Get)
            .await
            .unwrap();
        platform
            .authorize_role(tenant_id, "system/anonymous", "/gov/a.rxt", Action::Get)
            .await
            .unwrap();
        assert_eq!(platform.grants(tenant_id).unwrap().len(), 1);

        let provider = platform.provider(tenant_id, "admin@acme").await.unwrap();
        let roles = vec!["sales".to_string(), "ops".to_string()];
        provider
            .set_resource_permissions(Visibility::Restricted, &roles, "/apps/a")
            .await
            .unwrap();
        provider
            .set_resource_permissions(Visibility::Private, &[], "/apps/a")
            .await
            .unwrap();

        let grants: Vec<_> = platform
            .grants(tenant_id)
            .unwrap()
            .into_iter()
            .filter(|g| g.path == "/apps/a")
            .collect();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].subject, Subject::User("admin@acme".to_string()));
    }
}
