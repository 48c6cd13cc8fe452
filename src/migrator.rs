use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::backend::{Backend, SqlParam};
use crate::catalog::{self, Catalog};
use crate::dialect::Dialect;
use crate::error::Error;
use crate::migration::{Direction, Migration, Status};
use crate::path::PathParser;

/// Name of the tracking table unless [MigratorBuilder::tracking_table_name] says otherwise.
pub const DEFAULT_TRACKING_TABLE_NAME: &str = "_updown_migrations_";

type StartHook = Box<dyn Fn(u64, &str) + Send + Sync>;
type CompleteHook = Box<dyn Fn(u64, &str, Duration) + Send + Sync>;
type ErrorHook = Box<dyn Fn(u64, &str, &Error) + Send + Sync>;

#[derive(Default)]
struct Hooks {
    on_migration_start: Option<StartHook>,
    on_migration_complete: Option<CompleteHook>,
    on_migration_error: Option<ErrorHook>,
}

// Manual Debug impl since closures don't implement Debug
impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_migration_start", &self.on_migration_start.is_some())
            .field(
                "on_migration_complete",
                &self.on_migration_complete.is_some(),
            )
            .field("on_migration_error", &self.on_migration_error.is_some())
            .finish()
    }
}

fn validate_table_name(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidTrackingTableName(name.to_string()))
    }
}

/// Configures a [Migrator] before it touches the database.
///
/// ```
/// # #[cfg(feature = "sqlite")]
/// # {
/// use updown::{dialect::Sqlite, MigratorBuilder};
///
/// let dir = tempfile::tempdir().unwrap();
/// let conn = rusqlite::Connection::open_in_memory().unwrap();
/// let migrator = MigratorBuilder::new(dir.path())
///     .tracking_table_name("schema_migrations")
///     .on_migration_complete(|number, name, duration| {
///         println!("{number} {name} took {duration:?}");
///     })
///     .build(conn, Sqlite)
///     .unwrap();
/// assert_eq!(migrator.tracking_table_name(), "schema_migrations");
/// # }
/// ```
#[derive(Debug)]
pub struct MigratorBuilder {
    migrations_path: PathBuf,
    tracking_table_name: String,
    path_parser: PathParser,
    hooks: Hooks,
}

impl MigratorBuilder {
    pub fn new(migrations_path: impl AsRef<Path>) -> Self {
        Self {
            migrations_path: migrations_path.as_ref().to_path_buf(),
            tracking_table_name: DEFAULT_TRACKING_TABLE_NAME.to_string(),
            path_parser: PathParser::new(),
            hooks: Hooks::default(),
        }
    }

    /// Set a custom name for the tracking table.
    /// Defaults to [DEFAULT_TRACKING_TABLE_NAME].
    pub fn tracking_table_name(mut self, name: impl Into<String>) -> Self {
        self.tracking_table_name = name.into();
        self
    }

    /// Set a callback to be invoked when a migration starts, in either direction.
    /// The callback receives the migration number and name.
    pub fn on_migration_start<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, &str) + Send + Sync + 'static,
    {
        self.hooks.on_migration_start = Some(Box::new(callback));
        self
    }

    /// Set a callback to be invoked after a migration's transaction commits.
    /// The callback receives the migration number, name, and duration.
    pub fn on_migration_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, &str, Duration) + Send + Sync + 'static,
    {
        self.hooks.on_migration_complete = Some(Box::new(callback));
        self
    }

    /// Set a callback to be invoked when a migration fails.
    /// The callback receives the migration number, name, and error.
    pub fn on_migration_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64, &str, &Error) + Send + Sync + 'static,
    {
        self.hooks.on_migration_error = Some(Box::new(callback));
        self
    }

    /// Prepares the tracking table, scans the migrations directory and loads every
    /// migration's status.
    ///
    /// Nothing is returned unless every step succeeds. The tracking table may already have
    /// been created when a later step fails.
    pub fn build<B, D>(self, mut backend: B, dialect: D) -> Result<Migrator<B>, Error>
    where
        B: Backend,
        D: Dialect + 'static,
    {
        validate_table_name(&self.tracking_table_name)?;
        let migrations_path = catalog::normalize_migrations_path(&self.migrations_path)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            path = %migrations_path.display(),
            dialect = dialect.name(),
            table = %self.tracking_table_name,
            "Loading migrations"
        );

        let tracking_table_created =
            catalog::ensure_tracking_table(&mut backend, &dialect, &self.tracking_table_name)?;
        let mut catalog = Catalog::scan(&migrations_path, &self.path_parser)?;
        catalog.hydrate(&mut backend, &dialect, &self.tracking_table_name)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            total = catalog.len(),
            active = catalog.migrations(Status::Active).len(),
            "Migrations loaded"
        );

        Ok(Migrator {
            backend,
            dialect: Box::new(dialect),
            tracking_table_name: self.tracking_table_name,
            tracking_table_created,
            migrations_path,
            catalog,
            hooks: self.hooks,
        })
    }
}

struct Step {
    number: u64,
    name: String,
    path: PathBuf,
}

impl Step {
    fn for_migration(migration: &Migration, direction: Direction) -> Result<Self, Error> {
        let path = migration.path(direction).ok_or_else(|| {
            let other = migration
                .up_path()
                .or(migration.down_path())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            Error::InvalidMigrationPair(other)
        })?;
        Ok(Self {
            number: migration.number(),
            name: migration.name().to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// Applies and rolls back the migrations of one directory against one database.
///
/// Every migration runs in its own transaction together with its tracking row. A batch stops
/// at the first failure; migrations committed earlier in the same batch stay committed.
pub struct Migrator<B: Backend> {
    backend: B,
    dialect: Box<dyn Dialect>,
    tracking_table_name: String,
    tracking_table_created: bool,
    migrations_path: PathBuf,
    catalog: Catalog,
    hooks: Hooks,
}

impl<B: Backend> Migrator<B> {
    /// Builds a migrator with the default tracking table name and file naming convention.
    /// See [MigratorBuilder::build].
    pub fn new<D>(backend: B, dialect: D, migrations_path: impl AsRef<Path>) -> Result<Self, Error>
    where
        D: Dialect + 'static,
    {
        MigratorBuilder::new(migrations_path).build(backend, dialect)
    }

    /// Apply every inactive migration in ascending number order.
    pub fn migrate(&mut self) -> Result<(), Error> {
        let steps = self
            .catalog
            .migrations(Status::Inactive)
            .into_iter()
            .map(|migration| Step::for_migration(migration, Direction::Up))
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            pending = ?steps.iter().map(|step| (step.number, step.name.as_str())).collect::<Vec<_>>(),
            "Considering migrations to apply"
        );

        for step in &steps {
            self.run(step, Direction::Up)?;
        }
        Ok(())
    }

    /// Roll back the most recently applied migration.
    pub fn rollback(&mut self) -> Result<(), Error> {
        self.rollback_n(1)
    }

    /// Roll back the `count` most recently applied migrations, newest first.
    ///
    /// Asking for more than are active rolls back all of them. Returns
    /// [Error::NoActiveMigrations] if nothing is active.
    pub fn rollback_n(&mut self, count: usize) -> Result<(), Error> {
        if count == 0 {
            return Ok(());
        }
        let active = self.catalog.migrations(Status::Active);
        if active.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!("No active migrations to roll back");
            return Err(Error::NoActiveMigrations);
        }

        let steps = active
            .into_iter()
            .rev()
            .take(count)
            .map(|migration| Step::for_migration(migration, Direction::Down))
            .collect::<Result<Vec<_>, _>>()?;

        for step in &steps {
            self.run(step, Direction::Down)?;
        }
        Ok(())
    }

    /// Roll back every active migration, newest first.
    pub fn rollback_all(&mut self) -> Result<(), Error> {
        self.rollback_n(usize::MAX)
    }

    fn run(&mut self, step: &Step, direction: Direction) -> Result<(), Error> {
        #[cfg(feature = "tracing")]
        let _span = match direction {
            Direction::Up => {
                tracing::info_span!("migration_up", number = step.number, name = %step.name)
            }
            Direction::Down => {
                tracing::info_span!("migration_down", number = step.number, name = %step.name)
            }
        }
        .entered();

        #[cfg(feature = "tracing")]
        tracing::info!(%direction, "Starting migration");

        if let Some(ref callback) = self.hooks.on_migration_start {
            callback(step.number, &step.name);
        }

        let started = Instant::now();
        match self.execute_step(step, direction) {
            Ok(()) => {
                let status = match direction {
                    Direction::Up => Status::Active,
                    Direction::Down => Status::Inactive,
                };
                self.catalog.set_status(step.number, status);
                let duration = started.elapsed();

                #[cfg(feature = "tracing")]
                tracing::info!(
                    duration_ms = duration.as_millis(),
                    "Migration completed successfully"
                );

                if let Some(ref callback) = self.hooks.on_migration_complete {
                    callback(step.number, &step.name, duration);
                }
                Ok(())
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %error, "Migration failed");

                if let Some(ref callback) = self.hooks.on_migration_error {
                    callback(step.number, &step.name, &error);
                }
                Err(error)
            }
        }
    }

    /// Runs the body and the tracking row change in one transaction.
    fn execute_step(&mut self, step: &Step, direction: Direction) -> Result<(), Error> {
        let body = fs::read_to_string(&step.path).map_err(|source| Error::Io {
            path: step.path.clone(),
            source,
        })?;

        let number = i64::try_from(step.number)
            .map_err(|_| Error::Generic(format!("Migration number {} is too large", step.number)))?;
        let (log_sql, params) = match direction {
            Direction::Up => (
                self.dialect.insert_log_sql(&self.tracking_table_name),
                vec![
                    SqlParam::Int(number),
                    SqlParam::from(step.name.as_str()),
                    SqlParam::Int(Status::Active.as_i64()),
                ],
            ),
            Direction::Down => (
                self.dialect.update_log_sql(&self.tracking_table_name),
                vec![SqlParam::Int(Status::Inactive.as_i64()), SqlParam::Int(number)],
            ),
        };

        let mut tx = self.backend.begin()?;
        let result = tx
            .batch_execute(&body)
            .and_then(|()| tx.execute(&log_sql, &params));
        if let Err(error) = result {
            // The original failure is what the caller needs; a failed rollback is only logged.
            if let Err(_rollback_error) = tx.rollback() {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %_rollback_error, "Transaction rollback failed");
            }
            return Err(error);
        }
        tx.commit()
    }

    /// Migrations with the given status, ascending by number.
    pub fn migrations(&self, status: Status) -> Vec<&Migration> {
        self.catalog.migrations(status)
    }

    /// Every migration, ascending by number.
    pub fn all_migrations(&self) -> Vec<&Migration> {
        self.catalog.all()
    }

    pub fn get(&self, number: u64) -> Option<&Migration> {
        self.catalog.get(number)
    }

    pub fn migrations_path(&self) -> &Path {
        &self.migrations_path
    }

    pub fn tracking_table_name(&self) -> &str {
        &self.tracking_table_name
    }

    /// Whether building this migrator created the tracking table.
    pub fn tracking_table_created(&self) -> bool {
        self.tracking_table_created
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// The connection, for queries outside of the migrator. Statuses are not re-read.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

impl<B: Backend> fmt::Debug for Migrator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("dialect", &self.dialect.name())
            .field("tracking_table_name", &self.tracking_table_name)
            .field("migrations_path", &self.migrations_path)
            .field("catalog", &self.catalog)
            .field("hooks", &self.hooks)
            .finish()
    }
}
