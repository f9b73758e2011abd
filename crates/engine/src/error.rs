//! Error types for the migration engine
//!
//! Every failure is surfaced to the caller immediately; nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type MigrationResult<T> = Result<T, MigrationError>;

#[derive(Error, Debug)]
pub enum MigrationError {
    /// Database unreachable or credentials rejected
    #[error("connection error: {0}")]
    Connection(String),

    /// Migration directory or file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed migration file
    #[error("failed to parse migration {file}: {reason}")]
    Parse { file: String, reason: String },

    /// Applied set and discovered set disagree in a way that blocks execution
    #[error("plan error: {0}")]
    Plan(String),

    /// A migration failed; the `applied` migrations before it stay committed
    #[error("migration {id} failed ({applied} applied before it): {message}")]
    Exec {
        id: String,
        applied: usize,
        message: String,
    },

    /// Bookkeeping table could not be read or written
    #[error("migration store error: {0}")]
    Store(String),

    /// Unknown dialect or unusable connection parameters
    #[error("configuration error: {0}")]
    Config(String),
}

impl MigrationError {
    pub(crate) fn parse(file: impl Into<String>, reason: impl Into<String>) -> Self {
        MigrationError::Parse {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrationError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let e = MigrationError::parse("20240101_init.sql", "no Up or Down section marker");
        assert_eq!(
            e.to_string(),
            "failed to parse migration 20240101_init.sql: no Up or Down section marker"
        );

        let e = MigrationError::Exec {
            id: "002_users".into(),
            applied: 1,
            message: "syntax error".into(),
        };
        assert_eq!(
            e.to_string(),
            "migration 002_users failed (1 applied before it): syntax error"
        );

        let e = MigrationError::io(
            "/nowhere",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(e.to_string(), "failed to read /nowhere: missing");
    }
}
