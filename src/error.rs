use std::num::ParseIntError;
use std::path::PathBuf;

/// Error type for the updown crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The file name does not follow `<number>_<name>_<up|down>.<ext>`.
    /// The catalog skips such files.
    #[error("Invalid migration file: {}", .0.display())]
    InvalidMigrationFile(PathBuf),

    /// The file name looks like a migration but its number is larger than `i64::MAX`,
    /// the range of the tracking table's `migration_id` column.
    /// The catalog skips such files.
    #[error("Invalid migration number in {}: {source}", path.display())]
    InvalidMigrationNumber {
        path: PathBuf,
        #[source]
        source: ParseIntError,
    },

    /// An up file without its down file, or the other way around.
    #[error("Invalid pair of migration files for path: {}", .0.display())]
    InvalidMigrationPair(PathBuf),

    #[error("Migration number must be greater than 0, found in: {}", .0.display())]
    ZeroMigrationNumber(PathBuf),

    #[error(
        "Duplicate migration {number}: {} conflicts with {}",
        existing.display(),
        conflicting.display()
    )]
    DuplicateMigration {
        number: u64,
        existing: PathBuf,
        conflicting: PathBuf,
    },

    #[error("Invalid migrations path: {}", .0.display())]
    InvalidMigrationsPath(PathBuf),

    #[error("Invalid tracking table name: '{0}'")]
    InvalidTrackingTableName(String),

    #[error("Invalid migration status found in tracking table: {0}")]
    InvalidStatus(i64),

    #[error("No active migrations to rollback")]
    NoActiveMigrations,

    #[error("Error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "sqlite")]
    #[error("{0}")]
    Rusqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("{0}")]
    Postgres(#[from] postgres::Error),

    #[cfg(feature = "mysql")]
    #[error("{0}")]
    Mysql(String),

    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Whether the catalog treats this error as "not a migration file" and moves on.
    pub(crate) fn is_skippable(&self) -> bool {
        matches!(
            self,
            Error::InvalidMigrationFile(_) | Error::InvalidMigrationNumber { .. }
        )
    }
}

#[cfg(feature = "mysql")]
impl From<mysql::Error> for Error {
    fn from(value: mysql::Error) -> Self {
        Self::Mysql(value.to_string())
    }
}
