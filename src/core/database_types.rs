//! Database type definitions
//!
//! This module defines the backend kinds a connection can target.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DatabaseType {
    /// SQLite database (file or in-memory)
    #[default]
    Sqlite,
    /// PostgreSQL database
    Postgres,
}

impl DatabaseType {
    /// Convert database type to string representation
    pub fn to_str(&self) -> &'static str {
        match self {
            DatabaseType::Sqlite => "sqlite",
            DatabaseType::Postgres => "postgres",
        }
    }

    /// Check if the backend verifies credentials on connect
    pub fn authenticates(&self) -> bool {
        matches!(self, DatabaseType::Postgres)
    }

    /// Default port for network backends
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseType::Sqlite => None,
            DatabaseType::Postgres => Some(5432),
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DatabaseType::Sqlite),
            "postgres" | "postgresql" => Ok(DatabaseType::Postgres),
            _ => Err(format!("Invalid database type: '{}'", s)),
        }
    }
}
