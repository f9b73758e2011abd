//! Migrator - one connection, one dialect, one migration source
//!
//! Every operation re-reads the source and the bookkeeping table, so the
//! database stays the only source of truth between invocations.

use std::sync::Arc;

use sqlx::{AnyConnection, Connection};

use crate::config::ConnectionConfig;
use crate::dialect::{DialectRegistry, SqlDialect};
use crate::error::{MigrationError, MigrationResult};
use crate::migrations::{
    Migration, MigrationDirection, MigrationRecord, MigrationRunner, MigrationSource, Plan,
    Planner, RecordStore, StatusReport,
};

/// Runs migration operations against a single database connection
pub struct Migrator {
    conn: AnyConnection,
    store: RecordStore,
    source: Box<dyn MigrationSource>,
}

impl Migrator {
    /// Open a connection described by `config`
    pub async fn connect(
        config: &ConnectionConfig,
        registry: &DialectRegistry,
        source: Box<dyn MigrationSource>,
    ) -> MigrationResult<Self> {
        let dialect = registry.get(&config.dialect)?;
        let url = config.to_url(dialect.as_ref())?;

        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(&url).await.map_err(|e| {
            MigrationError::Connection(format!(
                "failed to connect to {} database '{}': {}",
                dialect.name(),
                config.database,
                e
            ))
        })?;

        tracing::debug!(
            dialect = dialect.name(),
            host = %config.host,
            database = %config.database,
            "connected"
        );

        Ok(Self::new(conn, dialect, source))
    }

    /// Wrap an already open connection
    pub fn new(
        conn: AnyConnection,
        dialect: Arc<dyn SqlDialect>,
        source: Box<dyn MigrationSource>,
    ) -> Self {
        Self {
            conn,
            store: RecordStore::new(dialect),
            source,
        }
    }

    /// Use `table` instead of `schema_migrations` for bookkeeping
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        let dialect = Arc::clone(self.store.dialect());
        self.store = RecordStore::with_table(dialect, table);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn connection(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }

    /// Applied records in application order
    pub async fn applied(&mut self) -> MigrationResult<Vec<MigrationRecord>> {
        self.store.ensure_table(&mut self.conn).await?;
        self.store.list_applied(&mut self.conn).await
    }

    /// Applied and pending migrations
    pub async fn status(&mut self) -> MigrationResult<StatusReport> {
        let (migrations, applied) = self.load().await?;
        StatusReport::build(&migrations, &applied)
    }

    /// Compute what `migrate` would run, without running it
    pub async fn plan(&mut self, direction: MigrationDirection, max_count: usize) -> MigrationResult<Plan> {
        let (migrations, applied) = self.load().await?;
        Planner::new(&migrations, &applied).plan(direction, max_count)
    }

    /// Run at most `max_count` migrations (0 = all) and return the IDs committed
    pub async fn migrate(
        &mut self,
        direction: MigrationDirection,
        max_count: usize,
    ) -> MigrationResult<Vec<String>> {
        let plan = self.plan(direction, max_count).await?;
        if plan.is_empty() {
            tracing::info!(%direction, "no migrations to run");
            return Ok(Vec::new());
        }

        let runner = MigrationRunner::new(&self.store);
        let count = runner.apply(&mut self.conn, &plan.migrations, direction).await?;

        Ok(plan.migrations[..count].iter().map(|m| m.id.clone()).collect())
    }

    /// Apply the next pending migration
    pub async fn up(&mut self) -> MigrationResult<Option<String>> {
        Ok(self.migrate(MigrationDirection::Up, 1).await?.into_iter().next())
    }

    /// Revert the most recently applied migration
    pub async fn down(&mut self) -> MigrationResult<Option<String>> {
        Ok(self.migrate(MigrationDirection::Down, 1).await?.into_iter().next())
    }

    /// Apply every pending migration
    pub async fn sync(&mut self) -> MigrationResult<Vec<String>> {
        self.migrate(MigrationDirection::Up, 0).await
    }

    /// Close the underlying connection
    pub async fn close(self) -> MigrationResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| MigrationError::Connection(format!("failed to close connection: {}", e)))
    }

    async fn load(&mut self) -> MigrationResult<(Vec<Migration>, Vec<MigrationRecord>)> {
        let migrations = self.source.discover()?;
        let applied = self.applied().await?;
        Ok((migrations, applied))
    }
}
