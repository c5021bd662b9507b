//! SQLite metadata catalog for buckets, blobs and access grants.
//!
//! Check-and-act pairs are collapsed into single statements wherever the
//! schema allows it: inserts rely on primary/foreign key violations and
//! deletes on the number of affected rows, so a concurrent writer can never
//! slip between the check and the act.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};

use crate::error::{Result, StoreError};
use crate::types::{Blob, Bucket, Grant};

/// Metadata catalog backed by a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Open (creating if missing) the catalog database at `path`.
    pub async fn new(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let catalog = Self { pool };
        catalog.run_migrations().await?;
        Ok(catalog)
    }

    /// Create an in-memory catalog.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        // Every connection to :memory: is its own database, so keep exactly
        // one alive for the lifetime of the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let catalog = Self { pool };
        catalog.run_migrations().await?;
        Ok(catalog)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Cheap round trip used by readiness checks.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // Buckets

    pub async fn bucket_exists(&self, id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM buckets WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert a bucket, failing with `Conflict` if the id is taken.
    pub async fn create_bucket(&self, id: &str, created_at: DateTime<Utc>) -> Result<Bucket> {
        let created_at = to_millis(created_at);
        sqlx::query("INSERT INTO buckets (id, created_at) VALUES (?1, ?2)")
            .bind(id)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("bucket '{}'", id))
                } else {
                    e.into()
                }
            })?;

        Ok(Bucket {
            id: id.to_string(),
            created_at: from_millis(created_at),
            blobs: Vec::new(),
        })
    }

    /// All buckets, each with its blobs.
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let mut tx = self.pool.begin().await?;

        let bucket_rows = sqlx::query(
            r#"
            SELECT id, created_at
            FROM buckets
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let blob_rows = sqlx::query(
            r#"
            SELECT bucket_id, id, size, created_at
            FROM blobs
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut blobs_by_bucket: HashMap<String, Vec<Blob>> = HashMap::new();
        for row in &blob_rows {
            let blob = blob_from_row(row);
            blobs_by_bucket
                .entry(blob.bucket_id.clone())
                .or_default()
                .push(blob);
        }

        Ok(bucket_rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                Bucket {
                    blobs: blobs_by_bucket.remove(&id).unwrap_or_default(),
                    created_at: from_millis(row.get("created_at")),
                    id,
                }
            })
            .collect())
    }

    /// A bucket with its blobs.
    pub async fn get_bucket(&self, id: &str) -> Result<Bucket> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT created_at FROM buckets WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::bucket_not_found(id))?;

        let blobs = sqlx::query(
            r#"
            SELECT bucket_id, id, size, created_at
            FROM blobs
            WHERE bucket_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Bucket {
            id: id.to_string(),
            created_at: from_millis(row.get("created_at")),
            blobs: blobs.iter().map(blob_from_row).collect(),
        })
    }

    /// Delete a bucket; its blobs and their grants go with it.
    pub async fn delete_bucket(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM buckets WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::bucket_not_found(id));
        }
        Ok(())
    }

    // Blobs

    pub async fn blob_exists(&self, bucket_id: &str, id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM blobs WHERE bucket_id = ?1 AND id = ?2")
            .bind(bucket_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert an empty blob record.
    ///
    /// Fails with `NotFound` when the bucket is missing and `Conflict` when
    /// the blob id is already used in that bucket.
    pub async fn create_blob(
        &self,
        bucket_id: &str,
        id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Blob> {
        let created_at = to_millis(created_at);
        sqlx::query(
            r#"
            INSERT INTO blobs (bucket_id, id, size, created_at)
            VALUES (?1, ?2, 0, ?3)
            "#,
        )
        .bind(bucket_id)
        .bind(id)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("blob '{}/{}'", bucket_id, id))
            } else if is_foreign_key_violation(&e) {
                StoreError::bucket_not_found(bucket_id)
            } else {
                e.into()
            }
        })?;

        Ok(Blob {
            id: id.to_string(),
            bucket_id: bucket_id.to_string(),
            size: 0,
            created_at: from_millis(created_at),
        })
    }

    pub async fn list_blobs(&self, bucket_id: &str) -> Result<Vec<Blob>> {
        let rows = sqlx::query(
            r#"
            SELECT bucket_id, id, size, created_at
            FROM blobs
            WHERE bucket_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(bucket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(blob_from_row).collect())
    }

    pub async fn get_blob(&self, bucket_id: &str, id: &str) -> Result<Blob> {
        let row = sqlx::query(
            r#"
            SELECT bucket_id, id, size, created_at
            FROM blobs
            WHERE bucket_id = ?1 AND id = ?2
            "#,
        )
        .bind(bucket_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::blob_not_found(bucket_id, id))?;
        Ok(blob_from_row(&row))
    }

    /// Add `amount` bytes to the recorded size and return the new total.
    ///
    /// This is the only statement that changes a blob's size; it must run once
    /// per successful append, after the bytes are on disk.
    pub async fn increment_blob_size(&self, bucket_id: &str, id: &str, amount: u64) -> Result<u64> {
        let amount = i64::try_from(amount)
            .map_err(|_| StoreError::validation("chunk", "length overflows the size column"))?;

        let row = sqlx::query(
            r#"
            UPDATE blobs
            SET size = size + ?1
            WHERE bucket_id = ?2 AND id = ?3
            RETURNING size
            "#,
        )
        .bind(amount)
        .bind(bucket_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::blob_not_found(bucket_id, id))?;

        Ok(row.get::<i64, _>("size") as u64)
    }

    /// Delete a blob record; grants referencing it go with it.
    pub async fn delete_blob(&self, bucket_id: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM blobs WHERE bucket_id = ?1 AND id = ?2")
            .bind(bucket_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::blob_not_found(bucket_id, id));
        }
        Ok(())
    }

    // Grants

    pub async fn grant_exists(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM grants WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert a grant for an existing blob.
    ///
    /// The foreign key makes the existence check and the insert one step: a
    /// grant is never recorded for a blob that is not there.
    pub async fn create_grant(
        &self,
        key: &str,
        bucket_id: &str,
        blob_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Grant> {
        let created_at = to_millis(created_at);
        sqlx::query(
            r#"
            INSERT INTO grants (key, bucket_id, blob_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(key)
        .bind(bucket_id)
        .bind(blob_id)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::blob_not_found(bucket_id, blob_id)
            } else if is_unique_violation(&e) {
                StoreError::Conflict(format!("access grant '{}'", key))
            } else {
                e.into()
            }
        })?;

        Ok(Grant {
            key: key.to_string(),
            bucket_id: bucket_id.to_string(),
            blob_id: blob_id.to_string(),
            created_at: from_millis(created_at),
        })
    }

    pub async fn get_grant(&self, key: &str) -> Result<Grant> {
        let row = sqlx::query(
            r#"
            SELECT key, bucket_id, blob_id, created_at
            FROM grants
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::grant_not_found(key))?;
        Ok(grant_from_row(&row))
    }

    /// Grants for one blob, oldest first.
    pub async fn list_grants(&self, bucket_id: &str, blob_id: &str) -> Result<Vec<Grant>> {
        let rows = sqlx::query(
            r#"
            SELECT key, bucket_id, blob_id, created_at
            FROM grants
            WHERE bucket_id = ?1 AND blob_id = ?2
            ORDER BY key
            "#,
        )
        .bind(bucket_id)
        .bind(blob_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(grant_from_row).collect())
    }

    /// The blob a grant currently points at.
    pub async fn resolve_grant(&self, key: &str) -> Result<Blob> {
        let row = sqlx::query(
            r#"
            SELECT
                blobs.bucket_id,
                blobs.id,
                blobs.size,
                blobs.created_at
            FROM grants
            INNER JOIN blobs ON blobs.bucket_id = grants.bucket_id AND blobs.id = grants.blob_id
            WHERE grants.key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::grant_not_found(key))?;
        Ok(blob_from_row(&row))
    }

    pub async fn delete_grant(&self, key: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM grants WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::grant_not_found(key));
        }
        Ok(())
    }
}

fn blob_from_row(row: &SqliteRow) -> Blob {
    Blob {
        id: row.get("id"),
        bucket_id: row.get("bucket_id"),
        size: row.get::<i64, _>("size") as u64,
        created_at: from_millis(row.get("created_at")),
    }
}

fn grant_from_row(row: &SqliteRow) -> Grant {
    Grant {
        key: row.get("key"),
        bucket_id: row.get("bucket_id"),
        blob_id: row.get("blob_id"),
        created_at: from_millis(row.get("created_at")),
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|e| e.is_foreign_key_violation())
}

#[cfg(test)]
impl Catalog {
    /// Count grants.
    pub async fn count_grants(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM grants")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}
