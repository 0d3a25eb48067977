//! SQLite partition handles and partition transactions.
//!
//! A partition transaction copies the partition's rows into
//! `resource_snapshots` when it begins. Commit drops the copy and rollback
//! restores it, touching no other tenant or partition.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::backend::{SqliteRegistry, internal_error, serialization_error};
use crate::core::RegistryPartition;
use crate::error::{BackendError, RegistryResult, ResourceError};
use crate::tenant::TenantId;
use crate::types::{PartitionKind, Resource, child_of, normalize_path};

/// A handle on one partition of a tenant in a [`SqliteRegistry`].
#[derive(Debug)]
pub struct SqlitePartition {
    registry: SqliteRegistry,
    tenant_id: TenantId,
    kind: PartitionKind,
}

impl SqlitePartition {
    pub(super) fn new(registry: SqliteRegistry, tenant_id: TenantId, kind: PartitionKind) -> Self {
        Self {
            registry,
            tenant_id,
            kind,
        }
    }

    fn exists_sync(&self, conn: &Connection, path: &str) -> RegistryResult<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM resources WHERE tenant_id = ?1 AND partition = ?2 AND path = ?3",
                params![self.tenant_id.value(), self.kind.as_str(), path],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get_sync(&self, conn: &Connection, path: String) -> RegistryResult<Resource> {
        let row = conn
            .query_row(
                "SELECT content, media_type, properties, last_modified FROM resources
                 WHERE tenant_id = ?1 AND partition = ?2 AND path = ?3",
                params![self.tenant_id.value(), self.kind.as_str(), path],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((content, media_type, properties, last_modified)) = row else {
            return Err(ResourceError::NotFound {
                partition: self.kind,
                path,
            }
            .into());
        };

        let properties: BTreeMap<String, String> = serde_json::from_str(&properties)
            .map_err(|e| serialization_error(format!("Invalid properties at {}: {}", path, e)))?;
        let last_modified = DateTime::parse_from_rfc3339(&last_modified)
            .map_err(|e| serialization_error(format!("Invalid timestamp at {}: {}", path, e)))?
            .with_timezone(&Utc);

        Ok(Resource::from_storage(
            content,
            media_type,
            properties,
            last_modified,
        ))
    }

    fn put_sync(&self, conn: &Connection, path: &str, resource: &Resource) -> RegistryResult<()> {
        let properties = serde_json::to_string(resource.properties())?;
        conn.execute(
            "INSERT INTO resources
                 (tenant_id, partition, path, content, media_type, properties, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(tenant_id, partition, path) DO UPDATE SET
                 content = excluded.content,
                 media_type = excluded.media_type,
                 properties = excluded.properties,
                 last_modified = excluded.last_modified",
            params![
                self.tenant_id.value(),
                self.kind.as_str(),
                path,
                resource.content(),
                resource.media_type(),
                properties,
                resource.last_modified().to_rfc3339()
            ],
        )
        .map_err(|e| internal_error(format!("Failed to store {}: {}", path, e)))?;
        Ok(())
    }

    fn children_sync(&self, conn: &Connection, parent: &str) -> RegistryResult<Vec<String>> {
        let prefix = if parent == "/" {
            "/".to_string()
        } else {
            format!("{}/", parent)
        };

        let mut stmt = conn.prepare(
            "SELECT path FROM resources
             WHERE tenant_id = ?1 AND partition = ?2 AND substr(path, 1, ?3) = ?4",
        )?;
        let rows = stmt.query_map(
            params![
                self.tenant_id.value(),
                self.kind.as_str(),
                prefix.chars().count() as i64,
                prefix
            ],
            |row| row.get::<_, String>(0),
        )?;

        let mut children = BTreeSet::new();
        for path in rows {
            if let Some(child) = child_of(parent, &path?) {
                children.insert(child);
            }
        }
        Ok(children.into_iter().collect())
    }

    fn key(&self) -> (TenantId, PartitionKind) {
        (self.tenant_id, self.kind)
    }

    fn snapshot_sync(&self, conn: &Connection) -> RegistryResult<()> {
        let tenant_id = self.tenant_id.value();
        let kind = self.kind.as_str();

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM resource_snapshots WHERE tenant_id = ?1 AND partition = ?2",
            params![tenant_id, kind],
        )?;
        tx.execute(
            "INSERT INTO resource_snapshots
                 (tenant_id, partition, path, content, media_type, properties, last_modified)
             SELECT tenant_id, partition, path, content, media_type, properties, last_modified
             FROM resources WHERE tenant_id = ?1 AND partition = ?2",
            params![tenant_id, kind],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Drops the partition's snapshot, first copying it back when `restore` is set.
    fn release_snapshot_sync(&self, conn: &Connection, restore: bool) -> RegistryResult<()> {
        let tenant_id = self.tenant_id.value();
        let kind = self.kind.as_str();

        let tx = conn.unchecked_transaction()?;
        if restore {
            tx.execute(
                "DELETE FROM resources WHERE tenant_id = ?1 AND partition = ?2",
                params![tenant_id, kind],
            )?;
            tx.execute(
                "INSERT INTO resources
                     (tenant_id, partition, path, content, media_type, properties, last_modified)
                 SELECT tenant_id, partition, path, content, media_type, properties, last_modified
                 FROM resource_snapshots WHERE tenant_id = ?1 AND partition = ?2",
                params![tenant_id, kind],
            )?;
        }
        tx.execute(
            "DELETE FROM resource_snapshots WHERE tenant_id = ?1 AND partition = ?2",
            params![tenant_id, kind],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn finish_transaction(&self, restore: bool) -> RegistryResult<()> {
        let mut open = self.registry.open_transactions().lock();
        if !open.contains(&self.key()) {
            return Err(BackendError::NoTransaction {
                partition: self.kind,
            }
            .into());
        }

        self.registry
            .with_connection(|conn| self.release_snapshot_sync(conn, restore))?;
        open.remove(&self.key());

        tracing::debug!(
            tenant_id = %self.tenant_id,
            partition = %self.kind,
            rolled_back = restore,
            "Finished partition transaction"
        );
        Ok(())
    }
}

#[async_trait]
impl RegistryPartition for SqlitePartition {
    fn kind(&self) -> PartitionKind {
        self.kind
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    async fn exists(&self, path: &str) -> RegistryResult<bool> {
        let path = normalize_path(path)?;
        self.registry
            .with_connection(|conn| self.exists_sync(conn, &path))
    }

    async fn get(&self, path: &str) -> RegistryResult<Resource> {
        let path = normalize_path(path)?;
        self.registry.with_connection(|conn| self.get_sync(conn, path))
    }

    async fn put(&self, path: &str, resource: Resource) -> RegistryResult<()> {
        let path = normalize_path(path)?;
        self.registry
            .with_connection(|conn| self.put_sync(conn, &path, &resource))
    }

    async fn children(&self, path: &str) -> RegistryResult<Vec<String>> {
        let parent = normalize_path(path)?;
        self.registry
            .with_connection(|conn| self.children_sync(conn, &parent))
    }

    async fn begin_transaction(&self) -> RegistryResult<()> {
        let mut open = self.registry.open_transactions().lock();
        if open.contains(&self.key()) {
            return Err(BackendError::TransactionActive {
                partition: self.kind,
            }
            .into());
        }

        self.registry.with_connection(|conn| self.snapshot_sync(conn))?;
        open.insert(self.key());

        tracing::debug!(
            tenant_id = %self.tenant_id,
            partition = %self.kind,
            "Began partition transaction"
        );
        Ok(())
    }

    async fn commit_transaction(&self) -> RegistryResult<()> {
        self.finish_transaction(false)
    }

    async fn rollback_transaction(&self) -> RegistryResult<()> {
        self.finish_transaction(true)
    }
}
