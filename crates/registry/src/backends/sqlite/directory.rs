//! Tenant directory, partition opening and permission providers for SQLite.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{Connection, params};

use super::backend::{SqliteRegistry, internal_error, load_tenant, require_tenant};
use super::partition::SqlitePartition;
use crate::core::{
    Principal, ProviderFactory, RegistryBackend, RegistryPartition, ResourceProvider,
    TenantDirectory,
};
use crate::error::{BackendError, IdentityError, RegistryResult};
use crate::tenant::{Tenant, TenantId};
use crate::types::{Action, PartitionKind, PermissionGrant, Subject, Visibility, grants_for_visibility};

fn insert_grant(conn: &Connection, tenant_id: TenantId, grant: &PermissionGrant) -> RegistryResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO permissions (tenant_id, subject_kind, subject_name, path, action)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            tenant_id.value(),
            grant.subject.kind(),
            grant.subject.name(),
            grant.path,
            grant.action.as_str()
        ],
    )?;
    Ok(())
}

#[async_trait]
impl TenantDirectory for SqliteRegistry {
    async fn resolve_admin_user(&self, tenant_id: TenantId) -> RegistryResult<String> {
        self.with_connection(|conn| {
            let row = require_tenant(conn, tenant_id)?;
            Ok(row.tenant.admin_name().to_string())
        })
    }

    async fn ensure_tenant_loaded(&self, tenant_id: TenantId) -> RegistryResult<()> {
        let updated = self.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE tenants SET loaded = 1 WHERE id = ?1 AND loaded = 0",
                [tenant_id.value()],
            )?;
            if updated == 0 {
                require_tenant(conn, tenant_id)?;
            }
            Ok(updated)
        })?;

        if updated > 0 {
            tracing::debug!(tenant_id = %tenant_id, "Loaded tenant registry");
        }
        Ok(())
    }

    async fn tenant_by_domain(&self, domain: &str) -> RegistryResult<Option<Tenant>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id, domain, admin_name FROM tenants WHERE domain = ?1")?;
            let mut rows = stmt.query_map([domain], |row| {
                Ok(Tenant::new(
                    TenantId::new(row.get(0)?),
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            Ok(rows.next().transpose()?)
        })
    }

    async fn list_tenants(&self) -> RegistryResult<Vec<Tenant>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id, domain, admin_name FROM tenants ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(Tenant::new(
                    TenantId::new(row.get(0)?),
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    async fn authorize_role(
        &self,
        tenant_id: TenantId,
        role: &str,
        path: &str,
        action: Action,
    ) -> RegistryResult<()> {
        self.with_connection(|conn| {
            require_tenant(conn, tenant_id)?;
            let grant = PermissionGrant::new(Subject::Role(role.to_string()), path, action);
            insert_grant(conn, tenant_id, &grant)
        })
    }
}

#[async_trait]
impl RegistryBackend for SqliteRegistry {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn open_partition(
        &self,
        kind: PartitionKind,
        principal: Principal,
        tenant_id: TenantId,
    ) -> RegistryResult<Arc<dyn RegistryPartition>> {
        self.with_connection(|conn| {
            let row = load_tenant(conn, tenant_id)?.ok_or_else(|| IdentityError::TenantNotFound {
                tenant: tenant_id.to_string(),
            })?;
            if !row.loaded {
                return Err(BackendError::TenantNotLoaded { tenant_id }.into());
            }
            if let Principal::User(name) = &principal {
                if name != row.tenant.admin_name() {
                    return Err(IdentityError::PrincipalRejected {
                        tenant_id,
                        principal: name.clone(),
                    }
                    .into());
                }
            }
            Ok(())
        })?;

        Ok(Arc::new(SqlitePartition::new(self.clone(), tenant_id, kind)))
    }
}

#[async_trait]
impl ProviderFactory for SqliteRegistry {
    async fn provider(
        &self,
        tenant_id: TenantId,
        admin_name: &str,
    ) -> RegistryResult<Arc<dyn ResourceProvider>> {
        self.with_connection(|conn| {
            let row = require_tenant(conn, tenant_id)?;
            if row.tenant.admin_name() != admin_name {
                return Err(IdentityError::PrincipalRejected {
                    tenant_id,
                    principal: admin_name.to_string(),
                }
                .into());
            }
            Ok(())
        })?;

        Ok(Arc::new(SqliteProvider {
            registry: self.clone(),
            tenant_id,
            admin_name: admin_name.to_string(),
        }))
    }
}

/// Provider handle recording grants into the permissions table.
struct SqliteProvider {
    registry: SqliteRegistry,
    tenant_id: TenantId,
    admin_name: String,
}

#[async_trait]
impl ResourceProvider for SqliteProvider {
    fn admin_name(&self) -> &str {
        &self.admin_name
    }

    async fn set_resource_permissions(
        &self,
        visibility: Visibility,
        roles: &[String],
        path: &str,
    ) -> RegistryResult<()> {
        let grants = grants_for_visibility(visibility, roles, &self.admin_name, path);

        self.registry.with_connection(|conn| {
            // A savepoint nests inside an open partition transaction.
            conn.execute_batch("SAVEPOINT resource_permissions")?;
            let replaced = (|| -> RegistryResult<()> {
                conn.execute(
                    "DELETE FROM permissions WHERE tenant_id = ?1 AND path = ?2",
                    params![self.tenant_id.value(), path],
                )?;
                for grant in &grants {
                    insert_grant(conn, self.tenant_id, grant)?;
                }
                Ok(())
            })();

            match replaced {
                Ok(()) => {
                    conn.execute_batch("RELEASE resource_permissions")?;
                    Ok(())
                }
                Err(err) => {
                    if let Err(e) = conn.execute_batch(
                        "ROLLBACK TO resource_permissions; RELEASE resource_permissions",
                    ) {
                        return Err(internal_error(format!(
                            "Failed to undo permission change on {}: {}",
                            path, e
                        )));
                    }
                    Err(err)
                }
            }
        })?;

        tracing::debug!(
            tenant_id = %self.tenant_id,
            path,
            visibility = ?visibility,
            grants = grants.len(),
            "Replaced resource permissions"
        );
        Ok(())
    }
}
