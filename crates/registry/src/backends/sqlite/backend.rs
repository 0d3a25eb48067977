//! SQLite registry platform.

use std::collections::HashSet;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, IdentityError, RegistryError, RegistryResult};
use crate::tenant::{Tenant, TenantId};
use crate::types::{Action, PartitionKind, PermissionGrant, Subject};

use super::schema;

pub(super) const BACKEND_NAME: &str = "sqlite";

pub(super) fn internal_error(message: String) -> RegistryError {
    RegistryError::Backend(BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
        source: None,
    })
}

pub(super) fn serialization_error(message: String) -> RegistryError {
    RegistryError::Backend(BackendError::SerializationError { message })
}

/// Configuration for the SQLite platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteRegistryConfig {
    /// Maximum number of connections in the pool. In-memory databases always use one.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,
}

fn default_max_connections() -> u32 {
    4
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteRegistryConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
        }
    }
}

/// Partitions with an open transaction, keyed by tenant and partition kind.
pub(super) type OpenTransactions = HashSet<(TenantId, PartitionKind)>;

/// SQLite registry platform.
///
/// Each partition of each tenant has at most one open transaction. Beginning
/// one snapshots the partition's rows into `resource_snapshots`; rollback
/// restores exactly that partition, so other tenants and partitions keep
/// their writes.
#[derive(Clone)]
pub struct SqliteRegistry {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteRegistryConfig,
    is_memory: bool,
    open_transactions: Arc<Mutex<OpenTransactions>>,
}

impl Debug for SqliteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegistry")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .field("open_transactions", &self.open_transactions.lock().len())
            .finish_non_exhaustive()
    }
}

impl SqliteRegistry {
    /// Creates a new in-memory platform.
    pub fn in_memory() -> RegistryResult<Self> {
        Self::with_config(":memory:", SqliteRegistryConfig::default())
    }

    /// Opens or creates a file-based database.
    pub fn open<P: AsRef<Path>>(path: P) -> RegistryResult<Self> {
        Self::with_config(path, SqliteRegistryConfig::default())
    }

    /// Creates a platform with custom configuration.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteRegistryConfig,
    ) -> RegistryResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms as u64);
        let enable_wal = config.enable_wal && !is_memory;
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        };
        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            if enable_wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            }
            Ok(())
        });

        // Every in-memory connection is its own database, so the pool keeps
        // exactly one connection alive for the platform's lifetime.
        let builder: r2d2::Builder<SqliteConnectionManager> = if is_memory {
            Pool::builder()
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            Pool::builder()
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections))
        };

        let pool = builder
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
            .build(manager)
            .map_err(|e| {
                RegistryError::Backend(BackendError::ConnectionFailed {
                    backend_name: BACKEND_NAME.to_string(),
                    message: e.to_string(),
                })
            })?;

        tracing::debug!(is_memory, "Opened SQLite registry");

        Ok(Self {
            pool,
            config,
            is_memory,
            open_transactions: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> RegistryResult<()> {
        self.with_connection(schema::initialize_schema)
    }

    /// Get a connection from the pool.
    ///
    /// Fails with [`BackendError::PoolExhausted`] when no connection frees up
    /// within the configured connection timeout.
    pub(crate) fn get_connection(
        &self,
    ) -> RegistryResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Runs `f` on a pooled connection.
    pub(super) fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let conn = self.get_connection()?;
        f(&conn)
    }

    pub(super) fn open_transactions(&self) -> &Mutex<OpenTransactions> {
        &self.open_transactions
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the platform configuration.
    pub fn config(&self) -> &SqliteRegistryConfig {
        &self.config
    }

    // ========================================================================
    // Tenant administration
    // ========================================================================

    /// Registers a tenant, updating the domain and admin of an existing one.
    ///
    /// A newly registered tenant starts unloaded. Fails with
    /// [`IdentityError::DuplicateDomain`] when another tenant owns the domain.
    pub fn register_tenant(&self, tenant: &Tenant) -> RegistryResult<()> {
        self.with_connection(|conn| {
            let owner: Option<i32> = conn
                .query_row(
                    "SELECT id FROM tenants WHERE domain = ?1 AND id <> ?2",
                    params![tenant.domain(), tenant.id().value()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(owner) = owner {
                return Err(IdentityError::DuplicateDomain {
                    domain: tenant.domain().to_string(),
                    tenant_id: TenantId::new(owner),
                }
                .into());
            }

            conn.execute(
                "INSERT INTO tenants (id, domain, admin_name, loaded, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     domain = excluded.domain,
                     admin_name = excluded.admin_name",
                params![
                    tenant.id().value(),
                    tenant.domain(),
                    tenant.admin_name(),
                    chrono::Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| internal_error(format!("Failed to register tenant {}: {}", tenant, e)))?;
            Ok(())
        })?;

        tracing::info!(tenant = %tenant, "Registered tenant");
        Ok(())
    }

    /// Returns `true` once the tenant's registry has been loaded.
    pub fn is_loaded(&self, tenant_id: TenantId) -> RegistryResult<bool> {
        self.with_connection(|conn| {
            Ok(load_tenant(conn, tenant_id)?.is_some_and(|row| row.loaded))
        })
    }

    /// Returns every permission grant recorded for the tenant.
    pub fn grants(&self, tenant_id: TenantId) -> RegistryResult<Vec<PermissionGrant>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT subject_kind, subject_name, path, action FROM permissions
                 WHERE tenant_id = ?1
                 ORDER BY path, subject_kind, subject_name, action",
            )?;
            let rows = stmt.query_map([tenant_id.value()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;

            let mut grants = Vec::new();
            for row in rows {
                let (kind, name, path, action) = row?;
                let subject = Subject::from_parts(&kind, name).ok_or_else(|| {
                    serialization_error(format!("unknown subject kind: {}", kind))
                })?;
                let action: Action = action.parse().map_err(serialization_error)?;
                grants.push(PermissionGrant::new(subject, path, action));
            }
            Ok(grants)
        })
    }
}

/// A row of the tenants table.
pub(super) struct TenantRow {
    pub(super) tenant: Tenant,
    pub(super) loaded: bool,
}

pub(super) fn load_tenant(conn: &Connection, tenant_id: TenantId) -> RegistryResult<Option<TenantRow>> {
    let row = conn
        .query_row(
            "SELECT id, domain, admin_name, loaded FROM tenants WHERE id = ?1",
            [tenant_id.value()],
            |row| {
                Ok(TenantRow {
                    tenant: Tenant::new(
                        TenantId::new(row.get(0)?),
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ),
                    loaded: row.get::<_, i64>(3)? != 0,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub(super) fn require_tenant(conn: &Connection, tenant_id: TenantId) -> RegistryResult<TenantRow> {
    load_tenant(conn, tenant_id)?.ok_or_else(|| {
        IdentityError::TenantNotFound {
            tenant: tenant_id.to_string(),
        }
        .into()
    })
}
