//! SQL dialect adapters.
//!
//! A [Dialect] only builds statement text for the tracking table; it never touches a
//! connection. Swapping the dialect is the only change needed to point the migrator at a
//! different database.
//!
//! | Dialect | Placeholders | Table lookup |
//! |---------|--------------|--------------|
//! | [Postgres] | `$1, $2, ...` | `information_schema.tables` in `current_schema()` |
//! | [Mysql] | `?` | `information_schema.tables` in `DATABASE()` |
//! | [Sqlite] | `?1, ?2, ...` | `sqlite_master` |
//!
//! Parameter order for every statement is documented on the trait method and is the same
//! for all dialects.

/// The statements the migrator needs to manage its tracking table.
///
/// The tracking table has four columns: `id` (surrogate key), `migration_id` (unique
/// migration number), `name` (unique migration name) and `status` (`0` inactive, `1` active).
pub trait Dialect {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Counts tables named after the single parameter: `(table_name)`.
    fn table_exists_sql(&self) -> String;

    /// Creates the tracking table.
    fn create_table_sql(&self, table: &str) -> String;

    /// Selects the `status` of a migration by name: `(name)`.
    fn status_sql(&self, table: &str) -> String;

    /// Records a migration: `(migration_id, name, status)`.
    ///
    /// Re-recording a number that already has a row replaces that row's name and status,
    /// so a migration rolled back earlier can be applied again.
    fn insert_log_sql(&self, table: &str) -> String;

    /// Updates the status of a migration by number: `(status, migration_id)`.
    fn update_log_sql(&self, table: &str) -> String;
}

/// PostgreSQL, with transactional DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn table_exists_sql(&self) -> String {
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = lower($1)"
            .to_string()
    }

    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE {table} (
                id           SERIAL       PRIMARY KEY,
                migration_id BIGINT       UNIQUE NOT NULL,
                name         VARCHAR(100) UNIQUE NOT NULL,
                status       INT          NOT NULL
            )"
        )
    }

    fn status_sql(&self, table: &str) -> String {
        format!("SELECT status FROM {table} WHERE name = $1")
    }

    fn insert_log_sql(&self, table: &str) -> String {
        format!(
            "INSERT INTO {table} (migration_id, name, status) VALUES ($1, $2, $3) \
             ON CONFLICT (migration_id) DO UPDATE SET name = EXCLUDED.name, status = EXCLUDED.status"
        )
    }

    fn update_log_sql(&self, table: &str) -> String {
        format!("UPDATE {table} SET status = $1 WHERE migration_id = $2")
    }
}

/// MySQL and MariaDB.
///
/// DDL statements cause an implicit commit in MySQL, so a failing migration body can leave
/// earlier statements of the same body applied. The tracking row is still only written when
/// the whole body succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mysql;

impl Dialect for Mysql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn table_exists_sql(&self) -> String {
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_name = ?"
            .to_string()
    }

    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE {table} (
                id           INT          NOT NULL AUTO_INCREMENT PRIMARY KEY,
                migration_id BIGINT       NOT NULL UNIQUE,
                name         VARCHAR(100) NOT NULL UNIQUE,
                status       INT          NOT NULL
            )"
        )
    }

    fn status_sql(&self, table: &str) -> String {
        format!("SELECT status FROM {table} WHERE name = ?")
    }

    fn insert_log_sql(&self, table: &str) -> String {
        format!(
            "INSERT INTO {table} (migration_id, name, status) VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE name = VALUES(name), status = VALUES(status)"
        )
    }

    fn update_log_sql(&self, table: &str) -> String {
        format!("UPDATE {table} SET status = ? WHERE migration_id = ?")
    }
}

/// SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn table_exists_sql(&self) -> String {
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1".to_string()
    }

    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE {table} (
                id           INTEGER      PRIMARY KEY AUTOINCREMENT,
                migration_id INTEGER      UNIQUE NOT NULL,
                name         VARCHAR(100) UNIQUE NOT NULL,
                status       INTEGER      NOT NULL
            )"
        )
    }

    fn status_sql(&self, table: &str) -> String {
        format!("SELECT status FROM {table} WHERE name = ?1")
    }

    fn insert_log_sql(&self, table: &str) -> String {
        format!(
            "INSERT INTO {table} (migration_id, name, status) VALUES (?1, ?2, ?3) \
             ON CONFLICT (migration_id) DO UPDATE SET name = excluded.name, status = excluded.status"
        )
    }

    fn update_log_sql(&self, table: &str) -> String {
        format!("UPDATE {table} SET status = ?1 WHERE migration_id = ?2")
    }
}

impl<D: Dialect + ?Sized> Dialect for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn table_exists_sql(&self) -> String {
        (**self).table_exists_sql()
    }

    fn create_table_sql(&self, table: &str) -> String {
        (**self).create_table_sql(table)
    }

    fn status_sql(&self, table: &str) -> String {
        (**self).status_sql(table)
    }

    fn insert_log_sql(&self, table: &str) -> String {
        (**self).insert_log_sql(table)
    }

    fn update_log_sql(&self, table: &str) -> String {
        (**self).update_log_sql(table)
    }
}
