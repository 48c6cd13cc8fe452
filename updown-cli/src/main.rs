//! updown CLI
//!
//! Applies and rolls back the SQL migration files of a directory.
//!
//! Exit codes:
//! - 0: Success, including a rollback with nothing to roll back
//! - 1: Any error (config, connection, invalid migration files, failing migration)

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use updown::dialect::{Mysql, Postgres, Sqlite};
use updown::mysql::MysqlConn;
use updown::postgres::{NoTls, PostgresClient};
use updown::sqlite::SqliteConnection;
use updown::{Backend, Dialect, Error, Migrator, MigratorBuilder, Status};

use crate::config::{Config, DialectKind, SqliteLocation};

/// Config file read when --config is not given. A missing default file is not an error.
const DEFAULT_CONFIG_FILE: &str = "updown.toml";

#[derive(Parser, Debug)]
#[command(name = "updown", version)]
#[command(about = "Apply and roll back SQL migration files", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL (defaults to the variable named by database.url_env)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Database type; inferred from the URL scheme when omitted
    #[arg(long, value_enum, global = true)]
    dialect: Option<DialectKind>,

    /// Directory containing the migration files
    #[arg(long, global = true)]
    migrations_dir: Option<PathBuf>,

    /// Name of the tracking table
    #[arg(long, global = true)]
    tracking_table: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Show every migration and whether it is active
    Status,
    /// Apply all inactive migrations
    Migrate,
    /// Roll back the most recent migration, or several
    Rollback {
        /// Number of migrations to roll back
        #[arg(long, conflicts_with = "all")]
        count: Option<usize>,

        /// Roll back every active migration
        #[arg(long)]
        all: bool,
    },
}

/// Everything needed to connect and build a migrator, after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    database_url: String,
    dialect: DialectKind,
    migrations_dir: PathBuf,
    tracking_table: String,
}

impl Settings {
    fn resolve(
        args: &Args,
        config: Config,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let database_url = match &args.database_url {
            Some(url) => url.clone(),
            None => env(&config.database.url_env).with_context(|| {
                format!(
                    "No database URL: pass --database-url or set {}",
                    config.database.url_env
                )
            })?,
        };
        let dialect = match args.dialect.or(config.database.dialect) {
            Some(dialect) => dialect,
            None => DialectKind::from_url(&database_url)?,
        };
        Ok(Self {
            database_url,
            dialect,
            migrations_dir: args
                .migrations_dir
                .clone()
                .unwrap_or(config.migrations.dir),
            tracking_table: args
                .tracking_table
                .clone()
                .unwrap_or(config.migrations.tracking_table),
        })
    }
}

fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("updown=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => {
            // User explicitly provided --config; file must exist.
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::from_file(path).context("Failed to load configuration")
        }
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Config::from_file(default_path).context("Failed to load configuration")
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let settings = Settings::resolve(&args, config, |name| std::env::var(name).ok())?;

    tracing::debug!(
        dialect = ?settings.dialect,
        migrations_dir = %settings.migrations_dir.display(),
        tracking_table = %settings.tracking_table,
        "Resolved settings"
    );

    match settings.dialect {
        DialectKind::Postgres => {
            let client = PostgresClient::connect(&settings.database_url, NoTls)
                .context("Failed to connect to PostgreSQL")?;
            execute(build(client, Postgres, &settings)?, &args.command)
        }
        DialectKind::Mysql => {
            let url = config::mysql_url(&settings.database_url);
            let conn = MysqlConn::new(url.as_str()).context("Failed to connect to MySQL")?;
            execute(build(conn, Mysql, &settings)?, &args.command)
        }
        DialectKind::Sqlite => {
            let conn = match config::sqlite_location(&settings.database_url)? {
                SqliteLocation::Memory => SqliteConnection::open_in_memory(),
                SqliteLocation::File(path) => SqliteConnection::open(path),
            }
            .context("Failed to open SQLite database")?;
            execute(build(conn, Sqlite, &settings)?, &args.command)
        }
    }
}

fn build<B, D>(backend: B, dialect: D, settings: &Settings) -> Result<Migrator<B>>
where
    B: Backend,
    D: Dialect + 'static,
{
    MigratorBuilder::new(&settings.migrations_dir)
        .tracking_table_name(settings.tracking_table.as_str())
        .build(backend, dialect)
        .with_context(|| {
            format!(
                "Failed to load migrations from {}",
                settings.migrations_dir.display()
            )
        })
}

fn execute<B: Backend>(mut migrator: Migrator<B>, command: &Command) -> Result<()> {
    match command {
        Command::Status => {
            print_status(&migrator);
            Ok(())
        }
        Command::Migrate => {
            let pending = migrator.migrations(Status::Inactive).len();
            let result = migrator.migrate();
            let applied = pending - migrator.migrations(Status::Inactive).len();
            println!("Applied {} migration(s)", applied);
            result.context("Migration failed")
        }
        Command::Rollback { count, all } => {
            let active = migrator.migrations(Status::Active).len();
            let result = if *all {
                migrator.rollback_all()
            } else {
                migrator.rollback_n(count.unwrap_or(1))
            };
            match result {
                Err(Error::NoActiveMigrations) => {
                    eprintln!("No active migrations to roll back");
                    Ok(())
                }
                result => {
                    let rolled_back = active - migrator.migrations(Status::Active).len();
                    println!("Rolled back {} migration(s)", rolled_back);
                    result.context("Rollback failed")
                }
            }
        }
    }
}

fn print_status<B: Backend>(migrator: &Migrator<B>) {
    let migrations = migrator.all_migrations();
    if migrations.is_empty() {
        println!("No migrations found in {}", migrator.migrations_path().display());
        return;
    }
    let width = migrations.iter().map(|m| m.name().len()).max().unwrap_or(0);
    for migration in migrations {
        let status = match migration.status() {
            Status::Active => "active",
            Status::Inactive => "inactive",
        };
        println!(
            "{:>6}  {:<width$}  {}",
            migration.number(),
            migration.name(),
            status,
            width = width
        );
    }
}
