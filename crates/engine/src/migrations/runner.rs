//! Migration Runner - executes planned migrations against the database
//!
//! Each migration runs in its own transaction together with its bookkeeping
//! write. A failure rolls back that migration only and stops the batch.

use sqlx::{AnyConnection, Connection, Executor};

use super::definitions::{Migration, MigrationDirection};
use super::store::RecordStore;
use crate::error::{MigrationError, MigrationResult};

/// Executes plans produced by the planner
pub struct MigrationRunner<'s> {
    store: &'s RecordStore,
}

impl<'s> MigrationRunner<'s> {
    pub fn new(store: &'s RecordStore) -> Self {
        Self { store }
    }

    /// Run `migrations` in order and return how many were committed.
    ///
    /// On failure the error carries the failing ID and the number of
    /// migrations committed before it.
    pub async fn apply(
        &self,
        conn: &mut AnyConnection,
        migrations: &[Migration],
        direction: MigrationDirection,
    ) -> MigrationResult<usize> {
        let mut applied = 0;

        for migration in migrations {
            tracing::info!(id = %migration.id, %direction, "running migration");

            self.apply_one(conn, migration, direction)
                .await
                .map_err(|message| MigrationError::Exec {
                    id: migration.id.clone(),
                    applied,
                    message,
                })?;

            applied += 1;
        }

        Ok(applied)
    }

    async fn apply_one(
        &self,
        conn: &mut AnyConnection,
        migration: &Migration,
        direction: MigrationDirection,
    ) -> Result<(), String> {
        let mut transaction = conn
            .begin()
            .await
            .map_err(|e| format!("failed to start transaction: {}", e))?;

        for (index, statement) in migration.statements(direction).iter().enumerate() {
            tracing::debug!(id = %migration.id, statement = index + 1, "{}", statement);

            if let Err(e) = (&mut *transaction).execute(statement.as_str()).await {
                let message = format!("statement {} failed: {}", index + 1, e);
                if let Err(rollback) = transaction.rollback().await {
                    tracing::error!(id = %migration.id, "rollback failed: {}", rollback);
                }
                return Err(message);
            }
        }

        let recorded = match direction {
            MigrationDirection::Up => self.store.record_applied(&mut transaction, &migration.id).await,
            MigrationDirection::Down => self.store.record_reverted(&mut transaction, &migration.id).await,
        };
        if let Err(e) = recorded {
            if let Err(rollback) = transaction.rollback().await {
                tracing::error!(id = %migration.id, "rollback failed: {}", rollback);
            }
            return Err(e.to_string());
        }

        transaction
            .commit()
            .await
            .map_err(|e| format!("failed to commit: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Sqlite;
    use sqlx::Row;
    use std::sync::Arc;

    async fn setup() -> (AnyConnection, RecordStore) {
        sqlx::any::install_default_drivers();
        let mut conn = AnyConnection::connect("sqlite::memory:").await.unwrap();
        let store = RecordStore::new(Arc::new(Sqlite));
        store.ensure_table(&mut conn).await.unwrap();
        (conn, store)
    }

    async fn table_exists(conn: &mut AnyConnection, name: &str) -> bool {
        let row = sqlx::query("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name.to_string())
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        row.get::<i64, _>(0) > 0
    }

    #[tokio::test]
    async fn test_empty_plan_applies_nothing() {
        let (mut conn, store) = setup().await;
        let count = MigrationRunner::new(&store)
            .apply(&mut conn, &[], MigrationDirection::Up)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back_whole_migration() {
        let (mut conn, store) = setup().await;
        let migrations = vec![Migration::new(
            "1_broken",
            vec![
                "CREATE TABLE half (id INTEGER);".to_string(),
                "INSERT INTO nowhere VALUES (1);".to_string(),
            ],
            vec![],
        )];

        let err = MigrationRunner::new(&store)
            .apply(&mut conn, &migrations, MigrationDirection::Up)
            .await
            .unwrap_err();

        match err {
            MigrationError::Exec { id, applied, message } => {
                assert_eq!(id, "1_broken");
                assert_eq!(applied, 0);
                assert!(message.starts_with("statement 2 failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!table_exists(&mut conn, "half").await);
        assert!(store.list_applied(&mut conn).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_down_removes_record_with_schema() {
        let (mut conn, store) = setup().await;
        let migrations = vec![Migration::new(
            "1_users",
            vec!["CREATE TABLE users (id INTEGER PRIMARY KEY);".to_string()],
            vec!["DROP TABLE users;".to_string()],
        )];
        let runner = MigrationRunner::new(&store);

        runner.apply(&mut conn, &migrations, MigrationDirection::Up).await.unwrap();
        assert!(table_exists(&mut conn, "users").await);
        assert_eq!(store.list_applied(&mut conn).await.unwrap()[0].id, "1_users");

        runner.apply(&mut conn, &migrations, MigrationDirection::Down).await.unwrap();
        assert!(!table_exists(&mut conn, "users").await);
        assert!(store.list_applied(&mut conn).await.unwrap().is_empty());
    }
}
