//! # Updown
//!
//! `updown` applies and rolls back plain SQL migration files kept in a directory, recording
//! which ones are active in a tracking table of the target database.
//!
//! Each migration is a pair of files sharing a number and a name:
//!
//! ```text
//! migrations/
//!   1_create_users_up.sql
//!   1_create_users_down.sql
//!   2_add_email_up.sql
//!   2_add_email_down.sql
//! ```
//!
//! Migrations are applied in ascending number order and rolled back newest first. Each one
//! runs in its own transaction together with the change to its tracking row.
//!
//! ## Features
//!
//! - `sqlite` (default): [Backend] for `rusqlite::Connection`
//! - `postgres`: [Backend] for `postgres::Client`
//! - `mysql`: [Backend] for `mysql::Conn` and `mysql::PooledConn`, for MySQL and MariaDB
//! - `tracing` (default): spans and events for every migration
//!
//! ## Example
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # {
//! use rusqlite::Connection;
//! use updown::{dialect::Sqlite, Error, Migrator, Status};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(
//!     dir.path().join("1_create_users_up.sql"),
//!     "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
//! )
//! .unwrap();
//! std::fs::write(dir.path().join("1_create_users_down.sql"), "DROP TABLE users;").unwrap();
//!
//! let mut conn = Connection::open_in_memory().unwrap();
//! let mut migrator = Migrator::new(&mut conn, Sqlite, dir.path()).unwrap();
//! assert_eq!(migrator.migrations(Status::Inactive).len(), 1);
//!
//! migrator.migrate().unwrap();
//! assert_eq!(migrator.migrations(Status::Active).len(), 1);
//!
//! migrator.rollback().unwrap();
//! assert!(matches!(migrator.rollback(), Err(Error::NoActiveMigrations)));
//! # }
//! ```

mod catalog;
mod error;
mod migration;
mod migrator;

pub mod backend;
pub mod dialect;
pub mod path;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(test, feature = "mysql"))]
mod test_mysql;
#[cfg(all(test, feature = "postgres"))]
mod test_postgres;

pub use backend::{Backend, SqlParam, Transaction};
pub use dialect::Dialect;
pub use error::Error;
pub use migration::{Direction, Migration, Status};
pub use migrator::{Migrator, MigratorBuilder, DEFAULT_TRACKING_TABLE_NAME};
