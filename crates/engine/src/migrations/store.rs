//! Migration Record Store - bookkeeping table inside the target database
//!
//! Every method takes the connection explicitly so that the executor can pass
//! the open transaction of the migration being applied.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{AnyConnection, Row};

use super::definitions::{MigrationRecord, DEFAULT_MIGRATIONS_TABLE};
use crate::dialect::SqlDialect;
use crate::error::{MigrationError, MigrationResult};

/// Reads and writes applied-migration records
#[derive(Debug, Clone)]
pub struct RecordStore {
    table: String,
    dialect: Arc<dyn SqlDialect>,
}

impl RecordStore {
    pub fn new(dialect: Arc<dyn SqlDialect>) -> Self {
        Self::with_table(dialect, DEFAULT_MIGRATIONS_TABLE)
    }

    pub fn with_table(dialect: Arc<dyn SqlDialect>, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            dialect,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn dialect(&self) -> &Arc<dyn SqlDialect> {
        &self.dialect
    }

    /// Create the bookkeeping table if it is missing
    pub async fn ensure_table(&self, conn: &mut AnyConnection) -> MigrationResult<()> {
        let sql = self.dialect.create_table_sql(&self.table);
        sqlx::query(&sql)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                MigrationError::Store(format!("failed to create table {}: {}", self.table, e))
            })?;
        Ok(())
    }

    /// Applied migrations in the order they were applied
    pub async fn list_applied(&self, conn: &mut AnyConnection) -> MigrationResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT id, applied_at, seq FROM {} ORDER BY seq ASC, id ASC",
            self.quoted_table()
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| MigrationError::Store(format!("failed to query applied migrations: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| MigrationError::Store(format!("failed to get migration id: {}", e)))?;
            let applied_at: String = row
                .try_get("applied_at")
                .map_err(|e| MigrationError::Store(format!("failed to get applied_at: {}", e)))?;
            let seq: i64 = row
                .try_get("seq")
                .map_err(|e| MigrationError::Store(format!("failed to get seq: {}", e)))?;

            records.push(MigrationRecord {
                applied_at: parse_timestamp(&id, &applied_at)?,
                id,
                seq,
            });
        }

        Ok(records)
    }

    /// Record `id` as applied now, after every migration applied so far
    pub async fn record_applied(&self, conn: &mut AnyConnection, id: &str) -> MigrationResult<()> {
        let seq = self.next_seq(conn).await?;
        let sql = format!(
            "INSERT INTO {} (id, applied_at, seq) VALUES ({}, {}, {})",
            self.quoted_table(),
            self.dialect.placeholder(0),
            self.dialect.placeholder(1),
            self.dialect.placeholder(2),
        );

        sqlx::query(&sql)
            .bind(id.to_string())
            .bind(format_timestamp(Utc::now()))
            .bind(seq)
            .execute(&mut *conn)
            .await
            .map_err(|e| MigrationError::Store(format!("failed to record migration {}: {}", id, e)))?;
        Ok(())
    }

    /// Remove the record for `id`
    pub async fn record_reverted(&self, conn: &mut AnyConnection, id: &str) -> MigrationResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE id = {}",
            self.quoted_table(),
            self.dialect.placeholder(0)
        );

        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(|e| MigrationError::Store(format!("failed to remove migration {}: {}", id, e)))?;

        if result.rows_affected() == 0 {
            return Err(MigrationError::Store(format!("migration {} is not recorded as applied", id)));
        }
        Ok(())
    }

    async fn next_seq(&self, conn: &mut AnyConnection) -> MigrationResult<i64> {
        let sql = format!("SELECT COALESCE(MAX(seq), 0) FROM {}", self.quoted_table());
        let row = sqlx::query(&sql)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| MigrationError::Store(format!("failed to get latest seq: {}", e)))?;

        let latest: i64 = row
            .try_get(0)
            .map_err(|e| MigrationError::Store(format!("failed to decode latest seq: {}", e)))?;
        Ok(latest + 1)
    }

    fn quoted_table(&self) -> String {
        self.dialect.quote_identifier(&self.table)
    }
}

/// Fixed-width RFC 3339 so that stored values sort chronologically
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: &str, value: &str) -> MigrationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| {
            MigrationError::Store(format!("invalid applied_at '{}' for migration {}: {}", value, id, e))
        })
}
