//! Configuration file parsing
//!
//! Reads `updown.toml`. Every value has a default, so the file is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Database flavours the CLI can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Postgres,
    /// MySQL and MariaDB
    Mysql,
    Sqlite,
}

impl DialectKind {
    /// Infers the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url.split_once(':').map(|(scheme, _)| scheme).unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            "sqlite" => Ok(DialectKind::Sqlite),
            _ => Err(ConfigError::Validation(format!(
                "Cannot infer database type from URL scheme '{}'; pass --dialect",
                scheme
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub migrations: MigrationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Environment variable holding the connection URL
    #[serde(default = "default_url_env")]
    pub url_env: String,

    /// Database type; inferred from the URL scheme when absent
    pub dialect: Option<DialectKind>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: default_url_env(),
            dialect: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationsConfig {
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_tracking_table")]
    pub tracking_table: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            tracking_table: default_tracking_table(),
        }
    }
}

fn default_url_env() -> String {
    "DATABASE_URL".to_string()
}

fn default_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_tracking_table() -> String {
    updown::DEFAULT_TRACKING_TABLE_NAME.to_string()
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        if config.database.url_env.is_empty() {
            return Err(ConfigError::Validation(
                "database.url_env must not be empty".to_string(),
            ));
        }
        Ok(config)
    }
}

/// Where a SQLite URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    Memory,
    File(PathBuf),
}

/// Accepts `sqlite://<path>`, `sqlite:<path>` and `sqlite::memory:`.
pub fn sqlite_location(url: &str) -> Result<SqliteLocation, ConfigError> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .ok_or_else(|| ConfigError::Validation(format!("Not a SQLite URL: {}", url)))?;
    match rest {
        ":memory:" => Ok(SqliteLocation::Memory),
        "" => Err(ConfigError::Validation(
            "SQLite URL has no database path".to_string(),
        )),
        path => Ok(SqliteLocation::File(PathBuf::from(path))),
    }
}

/// The `mysql` driver only understands the `mysql://` scheme.
pub fn mysql_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("mariadb") => {
            format!("mysql://{}", rest)
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.database.url_env, "DATABASE_URL");
        assert_eq!(config.database.dialect, None);
        assert_eq!(config.migrations.dir, PathBuf::from("migrations"));
        assert_eq!(config.migrations.tracking_table, "_updown_migrations_");
    }

    #[test]
    fn parses_every_section() {
        let config = Config::parse(
            r#"
            [database]
            url_env = "APP_DB"
            dialect = "mysql"

            [migrations]
            dir = "db/migrations"
            tracking_table = "schema_log"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.url_env, "APP_DB");
        assert_eq!(config.database.dialect, Some(DialectKind::Mysql));
        assert_eq!(config.migrations.dir, PathBuf::from("db/migrations"));
        assert_eq!(config.migrations.tracking_table, "schema_log");
    }

    #[test]
    fn rejects_unknown_dialect() {
        let result = Config::parse("[database]\ndialect = \"oracle\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_empty_url_env() {
        let result = Config::parse("[database]\nurl_env = \"\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updown.toml");
        std::fs::write(&path, "[migrations]\ndir = \"sql\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.migrations.dir, PathBuf::from("sql"));

        let missing = Config::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn infers_dialect_from_url_scheme() {
        let cases = [
            ("postgres://u:p@localhost/db", DialectKind::Postgres),
            ("postgresql://localhost/db", DialectKind::Postgres),
            ("mysql://root@localhost/db", DialectKind::Mysql),
            ("mariadb://root@localhost/db", DialectKind::Mysql),
            ("sqlite://app.db", DialectKind::Sqlite),
            ("sqlite::memory:", DialectKind::Sqlite),
        ];
        for (url, expected) in cases {
            assert_eq!(DialectKind::from_url(url).unwrap(), expected, "{url}");
        }
        assert!(DialectKind::from_url("oracle://db").is_err());
        assert!(DialectKind::from_url("no-scheme").is_err());
    }

    #[test]
    fn sqlite_urls() {
        assert_eq!(sqlite_location("sqlite::memory:").unwrap(), SqliteLocation::Memory);
        assert_eq!(
            sqlite_location("sqlite://data/app.db").unwrap(),
            SqliteLocation::File(PathBuf::from("data/app.db"))
        );
        assert_eq!(
            sqlite_location("sqlite:///var/app.db").unwrap(),
            SqliteLocation::File(PathBuf::from("/var/app.db"))
        );
        assert!(sqlite_location("sqlite://").is_err());
        assert!(sqlite_location("postgres://x").is_err());
    }

    #[test]
    fn mariadb_scheme_is_rewritten_for_the_driver() {
        assert_eq!(mysql_url("mariadb://root@db/app"), "mysql://root@db/app");
        assert_eq!(mysql_url("mysql://root@db/app"), "mysql://root@db/app");
    }
}
