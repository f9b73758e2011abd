//! # migrator-engine
//!
//! Applies, reverts and reports on versioned SQL schema migrations.
//!
//! Migrations are discovered from a [`MigrationSource`], compared against the
//! records in the target database's bookkeeping table, planned, and executed
//! one transaction per migration. [`Migrator`] ties these together over a
//! single connection.
//!
//! ```rust,no_run
//! use migrator_engine::{ConnectionConfig, DialectRegistry, DirectorySource, Migrator};
//!
//! # async fn run() -> migrator_engine::MigrationResult<()> {
//! let config = ConnectionConfig {
//!     dialect: "postgres".to_string(),
//!     database: "app".to_string(),
//!     ..Default::default()
//! };
//! let registry = DialectRegistry::with_defaults();
//! let dialect = registry.get(&config.dialect)?;
//! let source = DirectorySource::with_parser(
//!     "migrations",
//!     migrator_engine::MigrationParser::new(dialect.statement_delimiter()),
//! );
//!
//! let mut migrator = Migrator::connect(&config, &registry, Box::new(source)).await?;
//! let applied = migrator.sync().await;
//! migrator.close().await?;
//! println!("applied {:?}", applied?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dialect;
pub mod error;
pub mod migrations;
pub mod migrator;

pub use config::ConnectionConfig;
pub use dialect::{DialectRegistry, MySql, Postgres, SqlDialect, Sqlite};
pub use error::{MigrationError, MigrationResult};
pub use migrations::*;
pub use migrator::Migrator;
