//! Migration Definitions - Core types shared by the migration system
//!
//! Defines Migration, MigrationRecord, MigrationDirection and the ordering
//! rule used for every discovered set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default name of the bookkeeping table
pub const DEFAULT_MIGRATIONS_TABLE: &str = "schema_migrations";

/// A single versioned schema change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Unique, lexically sortable identifier (file name without extension)
    pub id: String,
    /// Statements applied when migrating up, in file order
    pub up: Vec<String>,
    /// Statements applied when reverting, in file order
    pub down: Vec<String>,
}

impl Migration {
    pub fn new(id: impl Into<String>, up: Vec<String>, down: Vec<String>) -> Self {
        Self {
            id: id.into(),
            up,
            down,
        }
    }

    /// Statements to run for `direction`
    pub fn statements(&self, direction: MigrationDirection) -> &[String] {
        match direction {
            MigrationDirection::Up => &self.up,
            MigrationDirection::Down => &self.down,
        }
    }
}

/// Ordering of migrations: ordinal comparison of their IDs.
///
/// Zero-padded or timestamp prefixes therefore sort chronologically, while
/// `10_x` sorts before `9_x`.
pub fn by_id(a: &Migration, b: &Migration) -> Ordering {
    a.id.as_bytes().cmp(b.id.as_bytes())
}

/// A row of the bookkeeping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration ID
    pub id: String,
    /// When the migration was applied
    pub applied_at: DateTime<Utc>,
    /// Application order, starting at 1
    pub seq: i64,
}

/// Migration direction for planning and execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    /// Apply the migration (run UP statements)
    Up,
    /// Rollback the migration (run DOWN statements)
    Down,
}

impl std::fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationDirection::Up => write!(f, "up"),
            MigrationDirection::Down => write!(f, "down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(id: &str) -> Migration {
        Migration::new(id, Vec::new(), Vec::new())
    }

    #[test]
    fn test_by_id_is_ordinal_not_numeric() {
        let mut migrations = vec![migration("9_c"), migration("10_b"), migration("010_a")];
        migrations.sort_by(by_id);

        let ids: Vec<&str> = migrations.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["010_a", "10_b", "9_c"]);
    }

    #[test]
    fn test_statements_by_direction() {
        let m = Migration::new(
            "1_users",
            vec!["CREATE TABLE users (id INT);".to_string()],
            vec!["DROP TABLE users;".to_string()],
        );
        assert_eq!(m.statements(MigrationDirection::Up)[0], "CREATE TABLE users (id INT);");
        assert_eq!(m.statements(MigrationDirection::Down)[0], "DROP TABLE users;");
    }
}
