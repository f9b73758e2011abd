use anyhow::{bail, Context, Result};
use migrator_engine::{
    DialectRegistry, DirectorySource, MigrationParser, MigrationResult, Migrator, StatusReport,
};

use crate::DatabaseArgs;

pub async fn status(args: &DatabaseArgs, json: bool) -> Result<()> {
    let mut migrator = open(args).await?;
    let result = migrator.status().await;
    let report = finish(migrator, result).await?;

    print!("{}", render_status(&report, json)?);
    Ok(())
}

pub async fn sync(args: &DatabaseArgs) -> Result<()> {
    let mut migrator = open(args).await?;
    let result = migrator.sync().await;
    let applied = finish(migrator, result).await?;

    print!("{}", sync_message(&applied));
    Ok(())
}

pub async fn up(args: &DatabaseArgs) -> Result<()> {
    let mut migrator = open(args).await?;
    let result = migrator.up().await;
    let applied = finish(migrator, result).await?;

    println!("{}", up_message(applied.as_deref()));
    Ok(())
}

pub async fn down(args: &DatabaseArgs) -> Result<()> {
    let mut migrator = open(args).await?;
    let result = migrator.down().await;
    let reverted = finish(migrator, result).await?;

    println!("{}", down_message(reverted.as_deref()));
    Ok(())
}

async fn open(args: &DatabaseArgs) -> Result<Migrator> {
    if !args.migrations.is_dir() {
        bail!(
            "migrations directory {} does not exist or is not a directory",
            args.migrations.display()
        );
    }

    let registry = DialectRegistry::with_defaults();
    let config = args.connection_config();
    let dialect = registry.get(&config.dialect)?;
    let source = DirectorySource::with_parser(
        &args.migrations,
        MigrationParser::new(dialect.statement_delimiter()),
    );

    let migrator = Migrator::connect(&config, &registry, Box::new(source)).await?;
    Ok(migrator.with_table(args.table.as_str()))
}

/// Close the connection on every path; the operation's own error wins
async fn finish<T>(migrator: Migrator, result: MigrationResult<T>) -> Result<T> {
    let closed = migrator.close().await;
    let value = result?;
    closed.context("migrations finished but the connection did not close cleanly")?;
    Ok(value)
}

fn render_status(report: &StatusReport, json: bool) -> Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(report)?;
        out.push('\n');
        Ok(out)
    } else {
        Ok(report.to_string())
    }
}

fn sync_message(applied: &[String]) -> String {
    if applied.is_empty() {
        return "Already has the latest database schema.\n".to_string();
    }

    let mut out = String::from("Migrated to the latest database schema.\n");
    for id in applied {
        out.push_str(&format!("- {}\n", id));
    }
    out
}

fn up_message(applied: Option<&str>) -> String {
    match applied {
        Some(id) => format!("Run migration complete, {}.", id),
        None => "No migration executed.".to_string(),
    }
}

fn down_message(reverted: Option<&str>) -> String {
    match reverted {
        Some(id) => format!("Revert migration complete, {}.", id),
        None => "No migration executed.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn sqlite_args(dir: &Path) -> DatabaseArgs {
        let migrations = dir.join("migrations");
        fs::create_dir_all(&migrations).unwrap();

        DatabaseArgs {
            dialect: "sqlite".to_string(),
            host: "127.0.0.1".to_string(),
            port: None,
            database: dir.join("app.db").display().to_string(),
            user: "root".to_string(),
            password: String::new(),
            migrations,
            table: "schema_migrations".to_string(),
            help: None,
        }
    }

    fn write_migration(args: &DatabaseArgs, id: &str, table: &str) {
        fs::write(
            args.migrations.join(format!("{id}.sql")),
            format!(
                "-- +migrate Up\nCREATE TABLE {table} (id INTEGER);\n-- +migrate Down\nDROP TABLE {table};\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_messages() {
        assert_eq!(sync_message(&[]), "Already has the latest database schema.\n");
        assert_eq!(
            sync_message(&["1_a".to_string(), "2_b".to_string()]),
            "Migrated to the latest database schema.\n- 1_a\n- 2_b\n"
        );
        assert_eq!(up_message(Some("1_a")), "Run migration complete, 1_a.");
        assert_eq!(up_message(None), "No migration executed.");
        assert_eq!(down_message(Some("1_a")), "Revert migration complete, 1_a.");
        assert_eq!(down_message(None), "No migration executed.");
    }

    #[tokio::test]
    async fn test_commands_against_sqlite_file() {
        let dir = TempDir::new().unwrap();
        let args = sqlite_args(dir.path());
        write_migration(&args, "1_users", "users");
        write_migration(&args, "2_posts", "posts");

        up(&args).await.unwrap();
        sync(&args).await.unwrap();
        status(&args, true).await.unwrap();
        down(&args).await.unwrap();

        let mut migrator = open(&args).await.unwrap();
        let result = migrator.status().await;
        let report = finish(migrator, result).await.unwrap();
        let applied: Vec<&str> = report.applied().map(|e| e.id.as_str()).collect();
        assert_eq!(applied, vec!["1_users"]);

        let json = render_status(&report, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entries"][1]["state"], "pending");
    }

    #[tokio::test]
    async fn test_missing_directory_fails_before_connecting() {
        let dir = TempDir::new().unwrap();
        let mut args = sqlite_args(dir.path());
        args.migrations = dir.path().join("absent");

        let err = sync(&args).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(!dir.path().join("app.db").exists());
    }

    #[tokio::test]
    async fn test_unknown_dialect_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut args = sqlite_args(dir.path());
        args.dialect = "oracle".to_string();

        let err = status(&args, false).await.unwrap_err();
        assert!(err.to_string().contains("oracle"));
    }
}
