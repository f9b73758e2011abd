use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use migrator_engine::MIGRATION_EXTENSION;

use crate::NewArgs;

/// Content of a freshly created migration
pub const MIGRATION_TEMPLATE: &str = "\
-- +migrate Up
-- SQL in section 'Up' is executed when this migration is applied.
CREATE TABLE examples (
  id BIGINT NOT NULL,
  PRIMARY KEY (id)
);

-- +migrate Down
-- SQL in section 'Down' is executed when this migration is rolled back.
DROP TABLE examples;
";

pub fn create(args: &NewArgs) -> Result<()> {
    let target = create_migration(&args.migrations, &args.name, Utc::now())?;
    println!("New migration created at \"{}\".", target.display());
    Ok(())
}

/// Write `<YYYYmmddHHMMSS>_<name>.sql` into `dir`, never overwriting
pub fn create_migration(dir: &Path, name: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    validate_name(name)?;

    if !dir.is_dir() {
        bail!(
            "migrations directory {} does not exist or is not a directory",
            dir.display()
        );
    }

    let file_name = format!("{}_{}{}", now.format("%Y%m%d%H%M%S"), name, MIGRATION_EXTENSION);
    let target = dir.join(file_name);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                anyhow::anyhow!("migration {} already exists", target.display())
            }
            _ => anyhow::Error::new(e).context(format!("failed to create {}", target.display())),
        })?;

    file.write_all(MIGRATION_TEMPLATE.as_bytes())
        .with_context(|| format!("failed to write {}", target.display()))?;

    tracing::info!(path = %target.display(), "created migration");
    Ok(target)
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("migration name is required");
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        bail!(
            "invalid migration name '{}': '{}' is not allowed (use letters, digits, '_' and '-')",
            name,
            c
        );
    }

    Ok(())
}
