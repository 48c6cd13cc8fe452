//! SQLite support using the [`rusqlite`](https://crates.io/crates/rusqlite) crate.
//!
//! SQLite runs DDL inside transactions, so a failing migration body leaves no trace: the
//! schema change and its tracking row are rolled back together.
//!
//! ```
//! use rusqlite::Connection;
//! use updown::{dialect::Sqlite, Migrator, Status};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("1_users_up.sql"), "CREATE TABLE users (id INTEGER PRIMARY KEY);").unwrap();
//! std::fs::write(dir.path().join("1_users_down.sql"), "DROP TABLE users;").unwrap();
//!
//! let mut conn = Connection::open_in_memory().unwrap();
//! let mut migrator = Migrator::new(&mut conn, Sqlite, dir.path()).unwrap();
//! migrator.migrate().unwrap();
//! assert_eq!(migrator.migrations(Status::Active).len(), 1);
//! ```

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::backend::{Backend, SqlParam, Transaction};
use crate::error::Error;

pub use rusqlite::Connection as SqliteConnection;

fn to_values(params: &[SqlParam]) -> Vec<Value> {
    params
        .iter()
        .map(|param| match param {
            SqlParam::Int(value) => Value::Integer(*value),
            SqlParam::Text(value) => Value::Text(value.clone()),
        })
        .collect()
}

impl Backend for Connection {
    fn query_scalar(&mut self, sql: &str, params: &[SqlParam]) -> Result<Option<i64>, Error> {
        let mut stmt = self.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(to_values(params)))?;
        let value = match rows.next()? {
            Some(row) => Some(row.get::<_, i64>(0)?),
            None => None,
        };
        Ok(value)
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<(), Error> {
        Connection::execute(self, sql, params_from_iter(to_values(params)))?;
        Ok(())
    }

    fn begin(&mut self) -> Result<Box<dyn Transaction + '_>, Error> {
        Ok(Box::new(self.transaction()?))
    }
}

impl Transaction for rusqlite::Transaction<'_> {
    fn batch_execute(&mut self, sql: &str) -> Result<(), Error> {
        self.execute_batch(sql)?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<(), Error> {
        Connection::execute(self, sql, params_from_iter(to_values(params)))?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), Error> {
        rusqlite::Transaction::commit(*self)?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), Error> {
        rusqlite::Transaction::rollback(*self)?;
        Ok(())
    }
}
