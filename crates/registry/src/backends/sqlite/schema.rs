//! SQLite schema definitions.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{BackendError, RegistryError, RegistryResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

fn schema_error(message: String) -> RegistryError {
    RegistryError::Backend(BackendError::SchemaError { message })
}

/// Initialize the database schema.
///
/// Fails on a database written by a newer schema version.
pub fn initialize_schema(conn: &Connection) -> RegistryResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        migrate_v1_to_v2(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        tracing::info!(version = SCHEMA_VERSION, "Created registry schema");
    } else if current_version == 1 {
        migrate_v1_to_v2(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        tracing::info!(from = 1, to = SCHEMA_VERSION, "Migrated registry schema");
    } else if current_version > SCHEMA_VERSION {
        return Err(schema_error(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Get the current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> RegistryResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| schema_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> RegistryResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| schema_error(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| schema_error(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> RegistryResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tenants (
            id INTEGER PRIMARY KEY,
            domain TEXT NOT NULL UNIQUE,
            admin_name TEXT NOT NULL,
            loaded INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS resources (
            tenant_id INTEGER NOT NULL,
            partition TEXT NOT NULL,
            path TEXT NOT NULL,
            content BLOB NOT NULL,
            media_type TEXT,
            properties TEXT NOT NULL DEFAULT '{}',
            last_modified TEXT NOT NULL,
            PRIMARY KEY (tenant_id, partition, path),
            FOREIGN KEY (tenant_id) REFERENCES tenants(id)
        );

        CREATE TABLE IF NOT EXISTS permissions (
            tenant_id INTEGER NOT NULL,
            subject_kind TEXT NOT NULL,
            subject_name TEXT NOT NULL,
            path TEXT NOT NULL,
            action TEXT NOT NULL,
            PRIMARY KEY (tenant_id, subject_kind, subject_name, path, action),
            FOREIGN KEY (tenant_id) REFERENCES tenants(id)
        );

        CREATE INDEX IF NOT EXISTS idx_permissions_path
            ON permissions(tenant_id, path);
        ",
    )
    .map_err(|e| schema_error(format!("Failed to create schema v1: {}", e)))
}

/// Adds the per-partition snapshots backing open partition transactions.
fn migrate_v1_to_v2(conn: &Connection) -> RegistryResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS resource_snapshots (
            tenant_id INTEGER NOT NULL,
            partition TEXT NOT NULL,
            path TEXT NOT NULL,
            content BLOB NOT NULL,
            media_type TEXT,
            properties TEXT NOT NULL DEFAULT '{}',
            last_modified TEXT NOT NULL,
            PRIMARY KEY (tenant_id, partition, path),
            FOREIGN KEY (tenant_id) REFERENCES tenants(id)
        );
        ",
    )
    .map_err(|e| schema_error(format!("Failed to migrate schema to v2: {}", e)))
}
