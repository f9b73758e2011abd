//! Migration sources
//!
//! A source is anything that can produce the full, ordered set of migrations.
//! The planner and executor only see the resulting `Vec<Migration>`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{by_id, Migration};
use super::parser::MigrationParser;
use crate::error::{MigrationError, MigrationResult};

/// File extension recognised as a migration
pub const MIGRATION_EXTENSION: &str = ".sql";

/// Produces the complete set of known migrations, sorted by ID
pub trait MigrationSource: Send + Sync {
    fn discover(&self) -> MigrationResult<Vec<Migration>>;
}

/// Migrations stored as `.sql` files in a single directory.
///
/// Files are parsed in file-name order and the first malformed file aborts
/// discovery, so the reported error is the same on every filesystem.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    parser: MigrationParser,
}

impl DirectorySource {
    /// Source over `dir` using the default `;` delimiter
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_parser(dir, MigrationParser::default())
    }

    pub fn with_parser(dir: impl Into<PathBuf>, parser: MigrationParser) -> Self {
        Self {
            dir: dir.into(),
            parser,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of the migration files in the directory, sorted
    fn migration_files(&self) -> MigrationResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| MigrationError::io(&self.dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::io(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                let lossy = file_name.to_string_lossy().into_owned();
                if lossy.ends_with(MIGRATION_EXTENSION) {
                    return Err(MigrationError::parse(lossy, "file name is not valid UTF-8"));
                }
                continue;
            };

            if name.ends_with(MIGRATION_EXTENSION) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

impl MigrationSource for DirectorySource {
    fn discover(&self) -> MigrationResult<Vec<Migration>> {
        let mut migrations = Vec::new();

        for name in self.migration_files()? {
            let id = &name[..name.len() - MIGRATION_EXTENSION.len()];
            if id.is_empty() {
                return Err(MigrationError::parse(&name, "migration id is empty"));
            }

            let path = self.dir.join(&name);
            let content = fs::read_to_string(&path).map_err(|e| MigrationError::io(&path, e))?;
            migrations.push(self.parser.parse(&name, id, &content)?);
        }

        tracing::debug!(
            dir = %self.dir.display(),
            count = migrations.len(),
            "discovered migrations"
        );

        finalize(migrations)
    }
}

/// Migrations compiled into the binary or assembled at runtime
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Vec<(String, String)>,
    parser: MigrationParser,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parser(parser: MigrationParser) -> Self {
        Self {
            files: Vec::new(),
            parser,
        }
    }

    /// Add a migration with its raw file content
    pub fn add(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push((id.into(), content.into()));
        self
    }
}

impl MigrationSource for MemorySource {
    fn discover(&self) -> MigrationResult<Vec<Migration>> {
        let migrations = self
            .files
            .iter()
            .map(|(id, content)| self.parser.parse(id, id, content))
            .collect::<MigrationResult<Vec<_>>>()?;

        finalize(migrations)
    }
}

/// Sort by ID and reject duplicates
fn finalize(mut migrations: Vec<Migration>) -> MigrationResult<Vec<Migration>> {
    migrations.sort_by(by_id);

    let mut seen = HashSet::new();
    for migration in &migrations {
        if !seen.insert(migration.id.as_str()) {
            return Err(MigrationError::parse(&migration.id, "duplicate migration id"));
        }
    }

    Ok(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = "-- +migrate Up\nCREATE TABLE t (id INT);\n-- +migrate Down\nDROP TABLE t;\n";

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_discover_sorts_by_id_and_skips_other_entries() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "20240102000000_posts.sql", VALID);
        write(&temp_dir, "20240101000000_users.sql", VALID);
        write(&temp_dir, "20240103000000_tags.sql", VALID);
        write(&temp_dir, "README.md", "not a migration");
        write(&temp_dir, "notes.sql.bak", "-- ignored");
        fs::create_dir(temp_dir.path().join("nested.sql")).unwrap();

        let migrations = DirectorySource::new(temp_dir.path()).discover().unwrap();
        let ids: Vec<&str> = migrations.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "20240101000000_users",
                "20240102000000_posts",
                "20240103000000_tags"
            ]
        );
        assert_eq!(migrations[0].down, vec!["DROP TABLE t;".to_string()]);
    }

    #[test]
    fn test_malformed_file_fails_whole_discovery() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "001_ok.sql", VALID);
        write(&temp_dir, "002_broken.sql", "CREATE TABLE nope (id INT);\n");
        write(&temp_dir, "003_ok.sql", VALID);

        let err = DirectorySource::new(temp_dir.path()).discover().unwrap_err();
        match err {
            MigrationError::Parse { file, .. } => assert_eq!(file, "002_broken.sql"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_first_malformed_file_in_name_order_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "b.sql", "garbage;\n");
        write(&temp_dir, "a.sql", "more garbage;\n");

        let err = DirectorySource::new(temp_dir.path()).discover().unwrap_err();
        assert!(err.to_string().contains("a.sql"));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let err = DirectorySource::new(&missing).discover().unwrap_err();
        assert!(matches!(err, MigrationError::Io { ref path, .. } if path == &missing));
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(DirectorySource::new(temp_dir.path()).discover().unwrap().is_empty());
    }

    #[test]
    fn test_memory_source_sorts_and_rejects_duplicates() {
        let source = MemorySource::new().add("2_b", VALID).add("1_a", VALID);
        let ids: Vec<String> = source.discover().unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["1_a", "2_b"]);

        let err = MemorySource::new().add("1_a", VALID).add("1_a", VALID).discover().unwrap_err();
        assert!(err.to_string().contains("duplicate migration id"));
    }
}
