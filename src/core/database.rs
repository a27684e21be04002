//! Database trait and connection configuration
//!
//! This module defines the backend trait every driver implements and the
//! configured endpoint a handler connects to.

use super::database_types::DatabaseType;
use super::error::{DatabaseError, Result};
use super::value::{DatabaseResult, DatabaseValue};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Core database trait that all database backends must implement
///
/// A backend owns at most one live connection. Every method other than
/// `connect` fails with [`DatabaseError::NotConnected`] when none is open.
#[async_trait]
pub trait Database: Send + Sync {
    /// Get the database type
    fn database_type(&self) -> DatabaseType;

    /// Connect with the given connection string, replacing any prior connection
    async fn connect(&self, connection_string: &str) -> Result<()>;

    /// Check if connected to the database
    fn is_connected(&self) -> bool;

    /// Disconnect from the database. Safe to call when already disconnected.
    async fn disconnect(&self) -> Result<()>;

    /// Execute a statement without parameters (DDL, DROP, ...)
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Execute a SELECT without parameters
    async fn query(&self, query: &str) -> Result<DatabaseResult>;

    /// Execute a SELECT with positional `?` parameters
    async fn query_with_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<DatabaseResult>;

    /// Execute an INSERT/UPDATE/DELETE with positional `?` parameters
    ///
    /// Returns the number of affected rows.
    async fn execute_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<u64>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> Result<()>;

    /// Commit the current transaction
    async fn commit(&self) -> Result<()>;

    /// Rollback the current transaction
    ///
    /// The in-transaction flag is cleared even when the driver reports an error.
    async fn rollback(&self) -> Result<()>;

    /// Check if currently in a transaction
    fn in_transaction(&self) -> bool;

    /// Check whether a table exists in the connected schema (case-insensitive)
    async fn table_exists(&self, table: &str) -> Result<bool>;
}

/// Configured database endpoint
///
/// Credentials are not part of the endpoint; they are supplied per session to
/// [`ConnectionHandler::connect`](crate::league::ConnectionHandler::connect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub db_type: DatabaseType,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub options: BTreeMap<String, String>,
    /// Log each statement with its parameters substituted
    pub print_statements: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionBuilder::new(DatabaseType::Sqlite).build()
    }
}

impl ConnectionConfig {
    pub const ENV_TYPE: &'static str = "LEAGUE_DB_TYPE";
    pub const ENV_HOST: &'static str = "LEAGUE_DB_HOST";
    pub const ENV_PORT: &'static str = "LEAGUE_DB_PORT";
    pub const ENV_NAME: &'static str = "LEAGUE_DB_NAME";
    pub const ENV_PRINT_SQL: &'static str = "LEAGUE_DB_PRINT_SQL";

    /// In-memory SQLite endpoint
    pub fn sqlite_memory() -> Self {
        Self::default()
    }

    /// Read the endpoint from `LEAGUE_DB_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the endpoint from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_type = match lookup(Self::ENV_TYPE) {
            Some(raw) => raw
                .parse::<DatabaseType>()
                .map_err(DatabaseError::InvalidConnectionString)?,
            None => DatabaseType::default(),
        };

        let mut builder = ConnectionBuilder::new(db_type);
        if let Some(host) = lookup(Self::ENV_HOST) {
            builder = builder.host(host);
        }
        if let Some(port) = lookup(Self::ENV_PORT) {
            let port = port.parse::<u16>().map_err(|e| {
                DatabaseError::InvalidConnectionString(format!("{}: {}", Self::ENV_PORT, e))
            })?;
            builder = builder.port(port);
        }
        if let Some(name) = lookup(Self::ENV_NAME) {
            builder = builder.database(name);
        }
        if let Some(flag) = lookup(Self::ENV_PRINT_SQL) {
            builder = builder.print_statements(matches!(
                flag.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ));
        }

        Ok(builder.build())
    }

    /// Endpoint description without credentials, for logs
    pub fn endpoint(&self) -> String {
        match self.db_type {
            DatabaseType::Sqlite => format!(
                "sqlite:{}",
                self.database.as_deref().unwrap_or(":memory:")
            ),
            DatabaseType::Postgres => format!(
                "postgres://{}:{}/{}",
                self.host.as_deref().unwrap_or("localhost"),
                self.port.or(self.db_type.default_port()).unwrap_or_default(),
                self.database.as_deref().unwrap_or("")
            ),
        }
    }

    /// Build the driver connection string for one session's credentials
    pub fn connection_string(&self, username: &str, password: &str) -> Result<String> {
        match self.db_type {
            DatabaseType::Sqlite => Ok(self
                .database
                .clone()
                .unwrap_or_else(|| ":memory:".to_string())),
            DatabaseType::Postgres => {
                if username.is_empty() {
                    return Err(DatabaseError::InvalidConnectionString(
                        "username must not be empty".to_string(),
                    ));
                }
                let mut parts = vec![
                    format!(
                        "host={}",
                        quote_value(self.host.as_deref().unwrap_or("localhost"))
                    ),
                    format!(
                        "port={}",
                        self.port.or(self.db_type.default_port()).unwrap_or(5432)
                    ),
                ];
                if let Some(database) = &self.database {
                    parts.push(format!("dbname={}", quote_value(database)));
                }
                parts.push(format!("user={}", quote_value(username)));
                parts.push(format!("password={}", quote_value(password)));
                for (key, value) in &self.options {
                    parts.push(format!("{}={}", key, quote_value(value)));
                }
                Ok(parts.join(" "))
            }
        }
    }
}

/// Quote a libpq key/value connection-string value when needed
fn quote_value(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Database connection builder
pub struct ConnectionBuilder {
    db_type: DatabaseType,
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    options: BTreeMap<String, String>,
    print_statements: bool,
}

impl ConnectionBuilder {
    /// Create a new connection builder for the specified database type
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            host: None,
            port: None,
            database: None,
            options: BTreeMap::new(),
            print_statements: false,
        }
    }

    /// Set the database host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the database port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database name (file path for SQLite)
    pub fn database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Add a custom option
    pub fn option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Log statements with their parameters substituted
    pub fn print_statements(mut self, enabled: bool) -> Self {
        self.print_statements = enabled;
        self
    }

    /// Finish the configuration
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            db_type: self.db_type,
            host: self.host,
            port: self.port,
            database: self.database,
            options: self.options,
            print_statements: self.print_statements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_connection_config_sqlite() {
        let config = ConnectionBuilder::new(DatabaseType::Sqlite)
            .database("league.db")
            .build();
        assert_eq!(config.connection_string("scott", "tiger").unwrap(), "league.db");
        assert_eq!(config.endpoint(), "sqlite:league.db");

        let config = ConnectionConfig::sqlite_memory();
        assert_eq!(config.connection_string("", "").unwrap(), ":memory:");
    }

    #[test]
    fn test_connection_config_postgres() {
        let config = ConnectionBuilder::new(DatabaseType::Postgres)
            .host("localhost")
            .port(1522)
            .database("stu")
            .build();

        let conn_str = config.connection_string("ora_user", "a8 secret").unwrap();
        assert!(conn_str.contains("host=localhost"));
        assert!(conn_str.contains("port=1522"));
        assert!(conn_str.contains("dbname=stu"));
        assert!(conn_str.contains("user=ora_user"));
        assert!(conn_str.contains("password='a8 secret'"));
        assert_eq!(config.endpoint(), "postgres://localhost:1522/stu");
    }

    #[test]
    fn test_postgres_requires_username() {
        let config = ConnectionBuilder::new(DatabaseType::Postgres).build();
        assert!(matches!(
            config.connection_string("", "pw"),
            Err(DatabaseError::InvalidConnectionString(_))
        ));
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("LEAGUE_DB_TYPE", "postgresql"),
            ("LEAGUE_DB_HOST", "dbhost"),
            ("LEAGUE_DB_PORT", "6543"),
            ("LEAGUE_DB_NAME", "league"),
            ("LEAGUE_DB_PRINT_SQL", "true"),
        ]
        .into_iter()
        .collect();

        let config =
            ConnectionConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.db_type, DatabaseType::Postgres);
        assert_eq!(config.host.as_deref(), Some("dbhost"));
        assert_eq!(config.port, Some(6543));
        assert_eq!(config.database.as_deref(), Some("league"));
        assert!(config.print_statements);
    }

    #[test]
    fn test_config_from_lookup_defaults_and_errors() {
        let config = ConnectionConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ConnectionConfig::sqlite_memory());

        let bad_port = ConnectionConfig::from_lookup(|key| {
            (key == "LEAGUE_DB_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(
            bad_port,
            Err(DatabaseError::InvalidConnectionString(_))
        ));
    }
}
