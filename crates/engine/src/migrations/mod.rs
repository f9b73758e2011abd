//! Migration System
//!
//! Discovery, bookkeeping, planning, execution and reporting of versioned SQL
//! migrations.

pub mod definitions;
pub mod parser;
pub mod planner;
pub mod runner;
pub mod source;
pub mod status;
pub mod store;

pub use definitions::*;
pub use parser::MigrationParser;
pub use planner::{Plan, Planner};
pub use runner::MigrationRunner;
pub use source::{DirectorySource, MemorySource, MigrationSource, MIGRATION_EXTENSION};
pub use status::{MigrationState, StatusEntry, StatusReport};
pub use store::RecordStore;
