//! Discovery of migration files and reconciliation with the tracking table.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, SqlParam};
use crate::dialect::Dialect;
use crate::error::Error;
use crate::migration::{Direction, Migration, Status};
use crate::path::PathParser;

/// The in-memory, status-hydrated set of migrations found in a directory, keyed by number.
#[derive(Debug, Clone, Default)]
pub(crate) struct Catalog {
    migrations: BTreeMap<u64, Migration>,
}

/// Checks that `dir` names a readable directory.
pub(crate) fn normalize_migrations_path(dir: &Path) -> Result<PathBuf, Error> {
    if dir.as_os_str().is_empty() || !dir.is_dir() {
        return Err(Error::InvalidMigrationsPath(dir.to_path_buf()));
    }
    Ok(dir.to_path_buf())
}

/// Creates the tracking table unless it already exists.
///
/// Returns `true` if the table was created by this call.
pub(crate) fn ensure_tracking_table<B: Backend + ?Sized>(
    backend: &mut B,
    dialect: &dyn Dialect,
    table: &str,
) -> Result<bool, Error> {
    let count = backend
        .query_scalar(&dialect.table_exists_sql(), &[SqlParam::from(table)])?
        .unwrap_or(0);
    if count > 0 {
        #[cfg(feature = "tracing")]
        tracing::debug!(table, "Found migrations table");
        return Ok(false);
    }

    #[cfg(feature = "tracing")]
    tracing::info!(table, dialect = dialect.name(), "Creating migrations table");

    backend.execute(&dialect.create_table_sql(table), &[])?;
    Ok(true)
}

impl Catalog {
    /// Builds the catalog from the files in `dir`.
    ///
    /// Files whose names are not migrations are skipped. Any number left without both an up
    /// and a down file rejects the whole directory.
    pub(crate) fn scan(dir: &Path, parser: &PathParser) -> Result<Self, Error> {
        let io_error = |source| Error::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        // read_dir has no defined order; sorting keeps conflict reports deterministic.
        paths.sort();

        let mut catalog = Self::default();
        for path in paths {
            let parsed = match parser.parse(&path) {
                Ok(parsed) => parsed,
                Err(error) if error.is_skippable() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(path = %path.display(), %error, "Skipping file");
                    continue;
                }
                Err(error) => return Err(error),
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(path = %path.display(), "Migration file found");

            catalog.insert(parsed.number, &parsed.name, parsed.direction, path)?;
        }

        for migration in catalog.migrations.values() {
            if let Err(error) = migration.validate() {
                #[cfg(feature = "tracing")]
                tracing::error!(number = migration.number, %error, "Invalid migration");
                return Err(error);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(count = catalog.migrations.len(), "Migration file pairs found");

        Ok(catalog)
    }

    fn insert(
        &mut self,
        number: u64,
        name: &str,
        direction: Direction,
        path: PathBuf,
    ) -> Result<(), Error> {
        let migration = self
            .migrations
            .entry(number)
            .or_insert_with(|| Migration::new(number, name));

        if migration.name != name {
            let existing = migration
                .up_path
                .clone()
                .or_else(|| migration.down_path.clone())
                .unwrap_or_default();
            return Err(Error::DuplicateMigration {
                number,
                existing,
                conflicting: path,
            });
        }

        let slot = match direction {
            Direction::Up => &mut migration.up_path,
            Direction::Down => &mut migration.down_path,
        };
        if let Some(existing) = slot {
            return Err(Error::DuplicateMigration {
                number,
                existing: existing.clone(),
                conflicting: path,
            });
        }
        *slot = Some(path);
        Ok(())
    }

    /// Overwrites each migration's status with the one recorded in the tracking table.
    /// Migrations without a row stay [Status::Inactive].
    pub(crate) fn hydrate<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        dialect: &dyn Dialect,
        table: &str,
    ) -> Result<(), Error> {
        let sql = dialect.status_sql(table);
        for migration in self.migrations.values_mut() {
            let row = backend.query_scalar(&sql, &[SqlParam::from(migration.name.as_str())])?;
            if let Some(value) = row {
                migration.status = Status::try_from(value)?;

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    number = migration.number,
                    name = %migration.name,
                    status = %migration.status,
                    "Migration found in tracking table"
                );
            }
        }
        Ok(())
    }

    /// Migrations with the given status, ascending by number.
    pub(crate) fn migrations(&self, status: Status) -> Vec<&Migration> {
        self.migrations
            .values()
            .filter(|migration| migration.status == status)
            .collect()
    }

    /// Every migration, ascending by number.
    pub(crate) fn all(&self) -> Vec<&Migration> {
        self.migrations.values().collect()
    }

    pub(crate) fn get(&self, number: u64) -> Option<&Migration> {
        self.migrations.get(&number)
    }

    pub(crate) fn set_status(&mut self, number: u64, status: Status) {
        if let Some(migration) = self.migrations.get_mut(&number) {
            migration.status = status;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.migrations.len()
    }
}
