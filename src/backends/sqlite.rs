//! SQLite database backend implementation
//!
//! This module provides a SQLite implementation of the Database trait.
//! rusqlite is blocking, so every call runs on tokio's blocking pool.

use crate::core::{
    database::Database,
    database_types::DatabaseType,
    error::{DatabaseError, Result},
    value::{DatabaseResult, DatabaseRow, DatabaseValue, SqlType, DATE_FORMAT},
};
use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, Row};
use std::sync::Arc;
use tokio::sync::Mutex;

/// SQLite database implementation
pub struct SqliteDatabase {
    connection: Arc<Mutex<Option<Connection>>>,
    in_transaction: Arc<Mutex<bool>>,
}

impl SqliteDatabase {
    /// Create a new, unconnected SQLite database instance
    pub fn new() -> Self {
        Self {
            connection: Arc::new(Mutex::new(None)),
            in_transaction: Arc::new(Mutex::new(false)),
        }
    }

    /// Map a declared column type onto the typed NULL marker, using SQLite's
    /// affinity rules
    fn declared_type(decl: Option<&str>) -> SqlType {
        let decl = decl.unwrap_or("").to_uppercase();
        if decl.contains("INT") {
            SqlType::Integer
        } else if decl.contains("DATE") {
            SqlType::Date
        } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
            SqlType::Double
        } else {
            SqlType::Text
        }
    }

    /// Convert a rusqlite Row to a DatabaseRow
    fn row_to_database_row(row: &Row, types: &[SqlType]) -> rusqlite::Result<DatabaseRow> {
        let mut db_row = DatabaseRow::new();
        let column_count = row.as_ref().column_count();

        for i in 0..column_count {
            let column_name = row.as_ref().column_name(i)?.to_lowercase();
            let value = match row.get_ref(i)? {
                rusqlite::types::ValueRef::Null => {
                    DatabaseValue::Null(types.get(i).copied().unwrap_or(SqlType::Text))
                }
                rusqlite::types::ValueRef::Integer(v) => DatabaseValue::Long(v),
                rusqlite::types::ValueRef::Real(v) => DatabaseValue::Double(v),
                rusqlite::types::ValueRef::Text(v) => {
                    DatabaseValue::Text(String::from_utf8_lossy(v).to_string())
                }
                rusqlite::types::ValueRef::Blob(v) => {
                    DatabaseValue::Text(String::from_utf8_lossy(v).to_string())
                }
            };
            db_row.insert(column_name, value);
        }

        Ok(db_row)
    }

    /// Convert DatabaseValue to rusqlite parameter, keeping NULLs typed
    fn value_to_param(value: &DatabaseValue) -> Box<dyn rusqlite::ToSql> {
        match value {
            DatabaseValue::Null(SqlType::Integer) => Box::new(None::<i32>),
            DatabaseValue::Null(SqlType::Double) => Box::new(None::<f64>),
            DatabaseValue::Null(SqlType::Text | SqlType::Date) => Box::new(None::<String>),
            DatabaseValue::Int(v) => Box::new(*v),
            DatabaseValue::Long(v) => Box::new(*v),
            DatabaseValue::Double(v) => Box::new(*v),
            DatabaseValue::Text(v) => Box::new(v.clone()),
            DatabaseValue::Date(d) => Box::new(d.format(DATE_FORMAT).to_string()),
        }
    }

    fn run_query(conn: &Connection, query: &str, params: &[DatabaseValue]) -> Result<DatabaseResult> {
        let rusqlite_params: Vec<Box<dyn rusqlite::ToSql>> =
            params.iter().map(Self::value_to_param).collect();

        let mut stmt = conn.prepare(query)?;
        let types: Vec<SqlType> = stmt
            .columns()
            .iter()
            .map(|column| Self::declared_type(column.decl_type()))
            .collect();

        let rows = stmt.query_map(params_from_iter(rusqlite_params.iter()), |row| {
            Self::row_to_database_row(row, &types)
        })?;

        let mut results = Vec::new();
        for row_result in rows {
            results.push(row_result?);
        }
        Ok(results)
    }

    /// Run `f` against the open connection on the blocking pool
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let connection_arc = Arc::clone(&self.connection);

        tokio::task::spawn_blocking(move || -> Result<T> {
            let connection = connection_arc.blocking_lock();
            let conn = connection.as_ref().ok_or(DatabaseError::NotConnected)?;
            f(conn)
        })
        .await
        .map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
    }

    /// Run `f` with the connection and the transaction flag locked together
    async fn with_transaction_state<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Connection, &mut bool) -> Result<()> + Send + 'static,
    {
        let connection_arc = Arc::clone(&self.connection);
        let in_transaction_arc = Arc::clone(&self.in_transaction);

        tokio::task::spawn_blocking(move || -> Result<()> {
            // Acquire both locks together to keep flag and connection in step
            let mut in_transaction = in_transaction_arc.blocking_lock();
            let connection = connection_arc.blocking_lock();
            let conn = connection.as_ref().ok_or(DatabaseError::NotConnected)?;
            f(conn, &mut in_transaction)
        })
        .await
        .map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
    }
}

impl Default for SqliteDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn connect(&self, connection_string: &str) -> Result<()> {
        self.disconnect().await?;

        let connection_string = connection_string.to_string();
        let connection_arc = Arc::clone(&self.connection);

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&connection_string)
                .map_err(|e| DatabaseError::connection(e.to_string()))?;

            // Referential rules, cascades included, are off by default in SQLite
            conn.execute_batch("PRAGMA foreign_keys = ON")
                .map_err(|e| DatabaseError::connection(e.to_string()))?;

            let mut connection = connection_arc.blocking_lock();
            *connection = Some(conn);
            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
    }

    fn is_connected(&self) -> bool {
        self.connection
            .try_lock()
            .map(|conn| conn.is_some())
            .unwrap_or(false)
    }

    async fn disconnect(&self) -> Result<()> {
        {
            let mut in_transaction = self.in_transaction.lock().await;
            *in_transaction = false;
        }

        let mut connection = self.connection.lock().await;
        if let Some(conn) = connection.take() {
            conn.close().map_err(|(_, e)| DatabaseError::from(e))?;
        }
        Ok(())
    }

    async fn execute(&self, query: &str) -> Result<u64> {
        let query = query.to_string();
        self.with_connection(move |conn| Ok(conn.execute(&query, [])? as u64))
            .await
    }

    async fn query(&self, query: &str) -> Result<DatabaseResult> {
        let query = query.to_string();
        self.with_connection(move |conn| Self::run_query(conn, &query, &[]))
            .await
    }

    async fn query_with_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<DatabaseResult> {
        let query = query.to_string();
        let params = params.to_vec();
        self.with_connection(move |conn| Self::run_query(conn, &query, &params))
            .await
    }

    async fn execute_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<u64> {
        let query = query.to_string();
        let params = params.to_vec();
        self.with_connection(move |conn| {
            let rusqlite_params: Vec<Box<dyn rusqlite::ToSql>> =
                params.iter().map(Self::value_to_param).collect();

            let mut stmt = conn.prepare(&query)?;
            let affected = stmt.execute(params_from_iter(rusqlite_params.iter()))?;
            Ok(affected as u64)
        })
        .await
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.with_transaction_state(|conn, in_transaction| {
            if *in_transaction {
                return Err(DatabaseError::transaction("Already in a transaction"));
            }

            // Execute SQL first, only set flag on success
            conn.execute_batch("BEGIN TRANSACTION")?;
            *in_transaction = true;
            Ok(())
        })
        .await
    }

    async fn commit(&self) -> Result<()> {
        self.with_transaction_state(|conn, in_transaction| {
            if !*in_transaction {
                return Err(DatabaseError::transaction("Not in a transaction"));
            }

            conn.execute_batch("COMMIT")?;
            *in_transaction = false;
            Ok(())
        })
        .await
    }

    async fn rollback(&self) -> Result<()> {
        self.with_transaction_state(|conn, in_transaction| {
            if !std::mem::replace(in_transaction, false) {
                return Err(DatabaseError::transaction("Not in a transaction"));
            }

            // SQLite may already have ended the transaction on some errors
            if conn.is_autocommit() {
                return Ok(());
            }
            conn.execute_batch("ROLLBACK")?;
            Ok(())
        })
        .await
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
            .try_lock()
            .map(|guard| *guard)
            .unwrap_or(false)
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let table = table.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND lower(name) = lower(?1)",
            )?;
            Ok(stmt.exists([table])?)
        })
        .await
    }
}

impl Drop for SqliteDatabase {
    fn drop(&mut self) {
        // Best-effort: Drop cannot await
        if let Ok(in_trans) = self.in_transaction.try_lock() {
            if *in_trans {
                if let Ok(connection) = self.connection.try_lock() {
                    if let Some(conn) = connection.as_ref() {
                        let _ = conn.execute_batch("ROLLBACK");
                    }
                }
            }
        }
    }
}
