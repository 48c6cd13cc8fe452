//! The connection seam between the migrator and a database driver.
//!
//! The migrator only needs a handful of primitives: run a query that yields one integer,
//! run a statement, and run statements inside a transaction. Driver bindings live in the
//! feature-gated `sqlite`, `postgres` and `mysql` modules.

use crate::error::Error;

/// A positional statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

/// A database connection the migrator can drive.
///
/// The migrator assumes exclusive, serialized use of the connection for as long as it holds it.
pub trait Backend {
    /// Runs `sql` and returns the first column of the first row as an integer, or `None`
    /// when the query produces no rows.
    fn query_scalar(&mut self, sql: &str, params: &[SqlParam]) -> Result<Option<i64>, Error>;

    /// Runs a single statement outside of any transaction.
    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<(), Error>;

    /// Opens a transaction. Dropping it without calling [Transaction::commit] rolls it back.
    fn begin(&mut self) -> Result<Box<dyn Transaction + '_>, Error>;
}

/// An open transaction on a [Backend].
pub trait Transaction {
    /// Runs an opaque SQL body, which may contain several statements, as one call.
    fn batch_execute(&mut self, sql: &str) -> Result<(), Error>;

    /// Runs a single parameterized statement.
    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<(), Error>;

    fn commit(self: Box<Self>) -> Result<(), Error>;

    fn rollback(self: Box<Self>) -> Result<(), Error>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn query_scalar(&mut self, sql: &str, params: &[SqlParam]) -> Result<Option<i64>, Error> {
        (**self).query_scalar(sql, params)
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<(), Error> {
        (**self).execute(sql, params)
    }

    fn begin(&mut self) -> Result<Box<dyn Transaction + '_>, Error> {
        (**self).begin()
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn query_scalar(&mut self, sql: &str, params: &[SqlParam]) -> Result<Option<i64>, Error> {
        (**self).query_scalar(sql, params)
    }

    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<(), Error> {
        (**self).execute(sql, params)
    }

    fn begin(&mut self) -> Result<Box<dyn Transaction + '_>, Error> {
        (**self).begin()
    }
}
