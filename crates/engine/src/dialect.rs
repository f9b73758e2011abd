//! SQL Dialects
//!
//! A dialect is the capability set the engine needs from a database flavour:
//! how to split statements, quote identifiers, bind parameters and create the
//! bookkeeping table. Dialects are looked up through an explicit
//! [`DialectRegistry`] handed to whoever needs one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{MigrationError, MigrationResult};

/// Database-specific SQL behaviour used by the migration engine
pub trait SqlDialect: fmt::Debug + Send + Sync {
    /// Canonical lowercase name
    fn name(&self) -> &'static str;

    /// URL scheme understood by the sqlx driver
    fn url_scheme(&self) -> &'static str;

    /// Port used when none is configured; `None` for file databases
    fn default_port(&self) -> Option<u16>;

    /// Token that terminates a statement in a migration file
    fn statement_delimiter(&self) -> &str {
        ";"
    }

    /// Character used to quote identifiers
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Quote an identifier, doubling any embedded quote characters
    fn quote_identifier(&self, ident: &str) -> String {
        let quote = self.identifier_quote();
        let escaped = ident.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Parameter placeholder for the zero-based `index`
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        "?".to_string()
    }

    /// DDL creating the bookkeeping table if it does not exist yet
    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id VARCHAR(255) NOT NULL PRIMARY KEY,\n    \
                applied_at VARCHAR(32) NOT NULL,\n    \
                seq BIGINT NOT NULL\n\
            )",
            self.quote_identifier(table)
        )
    }

    /// Extra query parameters appended to the connection URL
    fn connection_params(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }
}

/// MySQL / MariaDB
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn url_scheme(&self) -> &'static str {
        "mysql"
    }

    fn default_port(&self) -> Option<u16> {
        Some(3306)
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                `id` VARCHAR(255) NOT NULL,\n    \
                `applied_at` VARCHAR(32) NOT NULL,\n    \
                `seq` BIGINT NOT NULL,\n    \
                PRIMARY KEY (`id`)\n\
            ) ENGINE = InnoDB DEFAULT CHARSET = utf8mb4",
            self.quote_identifier(table)
        )
    }

    fn connection_params(&self) -> &'static [(&'static str, &'static str)] {
        &[("charset", "utf8mb4")]
    }
}

/// PostgreSQL
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn url_scheme(&self) -> &'static str {
        "postgres"
    }

    fn default_port(&self) -> Option<u16> {
        Some(5432)
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }
}

/// SQLite, where the database name is a file path
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn url_scheme(&self) -> &'static str {
        "sqlite"
    }

    fn default_port(&self) -> Option<u16> {
        None
    }
}

/// Lookup table from dialect name to implementation
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<dyn SqlDialect>>,
}

impl DialectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in MySQL, PostgreSQL and SQLite dialects
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("mysql", Arc::new(MySql));
        registry.register("postgres", Arc::new(Postgres));
        registry.register("postgresql", Arc::new(Postgres));
        registry.register("sqlite", Arc::new(Sqlite));
        registry
    }

    /// Register (or replace) a dialect under `name`
    pub fn register(&mut self, name: &str, dialect: Arc<dyn SqlDialect>) {
        self.dialects.insert(name.to_lowercase(), dialect);
    }

    /// Resolve a dialect by name, ignoring case
    pub fn get(&self, name: &str) -> MigrationResult<Arc<dyn SqlDialect>> {
        self.dialects
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| {
                let mut known: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
                known.sort_unstable();
                MigrationError::Config(format!(
                    "unsupported dialect '{}' (expected one of: {})",
                    name,
                    known.join(", ")
                ))
            })
    }
}
