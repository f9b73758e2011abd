mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use migrator_engine::{ConnectionConfig, DEFAULT_MIGRATIONS_TABLE};

use logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "migrator")]
#[command(version, about = "Database schema migration tool")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs as JSON lines
    #[arg(long, global = true, env = "MIGRATOR_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show database schema status
    #[command(disable_help_flag = true)]
    Status {
        #[command(flatten)]
        db: DatabaseArgs,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply every pending migration
    #[command(disable_help_flag = true)]
    Sync {
        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Run one migration
    #[command(disable_help_flag = true)]
    Up {
        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Revert one migration
    #[command(disable_help_flag = true)]
    Down {
        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Create a new migration file
    New(NewArgs),
}

/// Connection and source flags shared by the database commands.
///
/// `-h` selects the host, so help is only reachable through `--help`.
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Database dialect (mysql, postgres, sqlite)
    #[arg(long, default_value = "mysql", env = "MIGRATOR_DIALECT")]
    pub dialect: String,

    /// Database host
    #[arg(short = 'h', long, default_value = "127.0.0.1", env = "MIGRATOR_HOST")]
    pub host: String,

    /// Database port [default: dialect default]
    #[arg(short = 'p', long, env = "MIGRATOR_PORT")]
    pub port: Option<u16>,

    /// Database name, or file path for sqlite
    #[arg(short = 'd', long, env = "MIGRATOR_DATABASE")]
    pub database: String,

    /// Database user
    #[arg(short = 'u', long, default_value = "root", env = "MIGRATOR_USER")]
    pub user: String,

    /// Database password
    #[arg(
        short = 'P',
        long,
        default_value = "",
        env = "MIGRATOR_PASSWORD",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: String,

    /// Directory containing the migration files
    #[arg(short = 'm', long, env = "MIGRATOR_MIGRATIONS")]
    pub migrations: PathBuf,

    /// Bookkeeping table name
    #[arg(long, default_value = DEFAULT_MIGRATIONS_TABLE, env = "MIGRATOR_TABLE")]
    pub table: String,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl DatabaseArgs {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            dialect: self.dialect.clone(),
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Directory to create the migration in
    #[arg(short = 'm', long, env = "MIGRATOR_MIGRATIONS")]
    pub migrations: PathBuf,

    /// Migration name (letters, digits, '_' and '-')
    #[arg(short = 'n', long)]
    pub name: String,
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Status { db, json } => commands::migrate::status(&db, json).await,
        Commands::Sync { db } => commands::migrate::sync(&db).await,
        Commands::Up { db } => commands::migrate::up(&db).await,
        Commands::Down { db } => commands::migrate::down(&db).await,
        Commands::New(args) => commands::new::create(&args),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_verbosity(cli.verbose, cli.log_json);
    if let Err(e) = logging::init_logging(&logging) {
        eprintln!("migrator: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("migrator: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_database_flags_and_defaults() {
        let cli = Cli::try_parse_from([
            "migrator", "up", "-h", "db.internal", "-d", "app", "-m", "migrations",
        ])
        .unwrap();

        let Commands::Up { db } = cli.command else {
            panic!("expected up command");
        };
        let config = db.connection_config();
        assert_eq!(config.dialect, "mysql");
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, None);
        assert_eq!(config.user, "root");
        assert_eq!(config.password, "");
        assert_eq!(db.table, "schema_migrations");
        assert_eq!(db.migrations, PathBuf::from("migrations"));
    }

    #[test]
    fn test_short_flags_are_case_sensitive() {
        let cli = Cli::try_parse_from([
            "migrator", "status", "--dialect", "postgres", "-p", "6543", "-P", "secret", "-u",
            "admin", "-d", "app", "-m", "db/migrations", "--json",
        ])
        .unwrap();

        let Commands::Status { db, json } = cli.command else {
            panic!("expected status command");
        };
        assert!(json);
        assert_eq!(db.port, Some(6543));
        assert_eq!(db.password, "secret");
        assert_eq!(db.user, "admin");
        assert_eq!(db.dialect, "postgres");
    }

    #[test]
    fn test_database_is_required() {
        let result = Cli::try_parse_from(["migrator", "sync", "-m", "migrations"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_command_flags() {
        let cli =
            Cli::try_parse_from(["migrator", "new", "-m", "migrations", "-n", "add_users"]).unwrap();
        let Commands::New(args) = cli.command else {
            panic!("expected new command");
        };
        assert_eq!(args.name, "add_users");
    }
}
