//! Error types for the league data-access layer
//!
//! Every failure a handler operation can report is one of these variants.
//! A write that matches no row is not an error; see
//! [`WriteOutcome`](crate::league::WriteOutcome).

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Error types for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Authentication or network failure while opening a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// An operation was attempted with no open connection
    #[error("Not connected to database")]
    NotConnected,

    /// Statement preparation or execution failed
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Statement parameters were bound incorrectly
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Type conversion error
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Column missing from a result row
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Invalid connection configuration
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// PostgreSQL error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    PostgresError(#[from] tokio_postgres::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl DatabaseError {
    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        DatabaseError::ConnectionError(msg.into())
    }

    /// Create a new query error
    pub fn query<S: Into<String>>(msg: S) -> Self {
        DatabaseError::QueryError(msg.into())
    }

    /// Create a new parameter binding error
    pub fn parameter<S: Into<String>>(msg: S) -> Self {
        DatabaseError::ParameterError(msg.into())
    }

    /// Create a new type mismatch error
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        DatabaseError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a new transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        DatabaseError::TransactionError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Other(msg.into())
    }

    /// True for failures raised while preparing, executing or reading a statement.
    pub fn is_execution_error(&self) -> bool {
        match self {
            DatabaseError::QueryError(_)
            | DatabaseError::TypeMismatch { .. }
            | DatabaseError::ColumnNotFound(_) => true,
            #[cfg(feature = "sqlite")]
            DatabaseError::SqliteError(_) => true,
            #[cfg(feature = "postgres")]
            DatabaseError::PostgresError(_) => true,
            _ => false,
        }
    }

    /// True for connect-time failures
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionError(_) | DatabaseError::InvalidConnectionString(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DatabaseError::connection("Failed to connect");
        assert!(matches!(err, DatabaseError::ConnectionError(_)));
        assert!(err.is_connection_error());

        let err = DatabaseError::query("Invalid SQL");
        assert!(matches!(err, DatabaseError::QueryError(_)));
        assert!(err.is_execution_error());

        let err = DatabaseError::type_mismatch("i32", "String");
        assert!(matches!(err, DatabaseError::TypeMismatch { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = DatabaseError::connection("invalid username/password; logon denied");
        assert_eq!(
            err.to_string(),
            "Connection error: invalid username/password; logon denied"
        );

        assert_eq!(
            DatabaseError::NotConnected.to_string(),
            "Not connected to database"
        );

        let err = DatabaseError::parameter("parameter 2 is not bound");
        assert_eq!(err.to_string(), "Parameter error: parameter 2 is not bound");
    }

    #[test]
    fn test_not_connected_is_neither_execution_nor_connection() {
        let err = DatabaseError::NotConnected;
        assert!(!err.is_execution_error());
        assert!(!err.is_connection_error());
    }
}
