//! PostgreSQL database backend implementation
//!
//! This module provides a PostgreSQL implementation of the Database trait using tokio-postgres.
//! Statements are written with `?` placeholders and rewritten to `$n` here.

use crate::core::{
    database::Database,
    database_types::DatabaseType,
    error::{DatabaseError, Result},
    statement::placeholder_positions,
    value::{DatabaseResult, DatabaseRow, DatabaseValue, SqlType},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

/// PostgreSQL database implementation
pub struct PostgresDatabase {
    client: Arc<Mutex<Option<Client>>>,
    in_transaction: Arc<Mutex<bool>>,
}

/// Rewrite `?` placeholders into PostgreSQL's numbered `$n` form
pub fn numbered_placeholders(sql: &str) -> String {
    let mut rewritten = String::with_capacity(sql.len() + 8);
    let mut last = 0;

    for (n, offset) in placeholder_positions(sql).into_iter().enumerate() {
        rewritten.push_str(&sql[last..offset]);
        rewritten.push('$');
        rewritten.push_str(&(n + 1).to_string());
        last = offset + 1;
    }

    rewritten.push_str(&sql[last..]);
    rewritten
}

impl PostgresDatabase {
    /// Create a new, unconnected PostgreSQL database instance
    pub fn new() -> Self {
        Self {
            client: Arc::new(Mutex::new(None)),
            in_transaction: Arc::new(Mutex::new(false)),
        }
    }

    /// Convert a tokio_postgres Row to a DatabaseRow
    fn row_to_database_row(row: &Row) -> Result<DatabaseRow> {
        let mut db_row = DatabaseRow::new();

        for (idx, column) in row.columns().iter().enumerate() {
            let column_name = column.name().to_string();
            let value = match column.type_().name() {
                "int2" => row
                    .try_get::<_, Option<i16>>(idx)?
                    .map(|v| DatabaseValue::Int(v as i32))
                    .unwrap_or(DatabaseValue::Null(SqlType::Integer)),
                "int4" => row
                    .try_get::<_, Option<i32>>(idx)?
                    .map(DatabaseValue::Int)
                    .unwrap_or(DatabaseValue::Null(SqlType::Integer)),
                "int8" => row
                    .try_get::<_, Option<i64>>(idx)?
                    .map(DatabaseValue::Long)
                    .unwrap_or(DatabaseValue::Null(SqlType::Integer)),
                "float4" => row
                    .try_get::<_, Option<f32>>(idx)?
                    .map(|v| DatabaseValue::Double(v as f64))
                    .unwrap_or(DatabaseValue::Null(SqlType::Double)),
                "float8" => row
                    .try_get::<_, Option<f64>>(idx)?
                    .map(DatabaseValue::Double)
                    .unwrap_or(DatabaseValue::Null(SqlType::Double)),
                "date" => row
                    .try_get::<_, Option<NaiveDate>>(idx)?
                    .map(DatabaseValue::Date)
                    .unwrap_or(DatabaseValue::Null(SqlType::Date)),
                "text" | "varchar" | "bpchar" | "name" => row
                    .try_get::<_, Option<String>>(idx)?
                    .map(|s| DatabaseValue::Text(s.trim_end().to_string()))
                    .unwrap_or(DatabaseValue::Null(SqlType::Text)),
                other => {
                    return Err(DatabaseError::type_mismatch(
                        "integer, double, date or text column",
                        other,
                    ))
                }
            };
            db_row.insert(column_name, value);
        }

        Ok(db_row)
    }

    /// Convert DatabaseValue to postgres parameter, keeping NULLs typed
    fn value_to_param(value: &DatabaseValue) -> Box<dyn ToSql + Sync + Send> {
        match value {
            DatabaseValue::Null(SqlType::Integer) => Box::new(None::<i32>),
            DatabaseValue::Null(SqlType::Double) => Box::new(None::<f64>),
            DatabaseValue::Null(SqlType::Text) => Box::new(None::<String>),
            DatabaseValue::Null(SqlType::Date) => Box::new(None::<NaiveDate>),
            DatabaseValue::Int(v) => Box::new(*v),
            DatabaseValue::Long(v) => Box::new(*v),
            DatabaseValue::Double(v) => Box::new(*v),
            DatabaseValue::Text(v) => Box::new(v.clone()),
            DatabaseValue::Date(v) => Box::new(*v),
        }
    }

    async fn set_transaction(&self, sql: &str, expect_open: bool) -> Result<()> {
        let mut in_transaction = self.in_transaction.lock().await;

        let client = self.client.lock().await;
        let client = client.as_ref().ok_or(DatabaseError::NotConnected)?;

        if *in_transaction != expect_open {
            return Err(DatabaseError::transaction(if expect_open {
                "Not in a transaction"
            } else {
                "Already in a transaction"
            }));
        }

        client.batch_execute(sql).await?;
        *in_transaction = !expect_open;
        Ok(())
    }
}

impl Default for PostgresDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn connect(&self, connection_string: &str) -> Result<()> {
        self.disconnect().await?;

        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| DatabaseError::connection(e.to_string()))?;

        // The connection object drives the socket until the client is dropped
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        let mut client_guard = self.client.lock().await;
        *client_guard = Some(client);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client
            .try_lock()
            .map(|client| client.as_ref().is_some_and(|c| !c.is_closed()))
            .unwrap_or(false)
    }

    async fn disconnect(&self) -> Result<()> {
        {
            let mut in_transaction = self.in_transaction.lock().await;
            *in_transaction = false;
        }

        let mut client = self.client.lock().await;
        *client = None;
        Ok(())
    }

    async fn execute(&self, query: &str) -> Result<u64> {
        let client = self.client.lock().await;
        let client = client.as_ref().ok_or(DatabaseError::NotConnected)?;
        Ok(client.execute(query, &[]).await?)
    }

    async fn query(&self, query: &str) -> Result<DatabaseResult> {
        let client = self.client.lock().await;
        let client = client.as_ref().ok_or(DatabaseError::NotConnected)?;

        let rows = client.query(query, &[]).await?;
        rows.iter().map(Self::row_to_database_row).collect()
    }

    async fn query_with_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<DatabaseResult> {
        let client = self.client.lock().await;
        let client = client.as_ref().ok_or(DatabaseError::NotConnected)?;

        let postgres_params: Vec<Box<dyn ToSql + Sync + Send>> =
            params.iter().map(Self::value_to_param).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = postgres_params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = client
            .query(&numbered_placeholders(query), &param_refs)
            .await?;
        rows.iter().map(Self::row_to_database_row).collect()
    }

    async fn execute_with_params(&self, query: &str, params: &[DatabaseValue]) -> Result<u64> {
        let client = self.client.lock().await;
        let client = client.as_ref().ok_or(DatabaseError::NotConnected)?;

        let postgres_params: Vec<Box<dyn ToSql + Sync + Send>> =
            params.iter().map(Self::value_to_param).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = postgres_params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        Ok(client
            .execute(&numbered_placeholders(query), &param_refs)
            .await?)
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.set_transaction("BEGIN", false).await
    }

    async fn commit(&self) -> Result<()> {
        self.set_transaction("COMMIT", true).await
    }

    async fn rollback(&self) -> Result<()> {
        let mut in_transaction = self.in_transaction.lock().await;
        let client = self.client.lock().await;
        let client = client.as_ref().ok_or(DatabaseError::NotConnected)?;

        if !std::mem::replace(&mut *in_transaction, false) {
            return Err(DatabaseError::transaction("Not in a transaction"));
        }

        client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
            .try_lock()
            .map(|guard| *guard)
            .unwrap_or(false)
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let client = self.client.lock().await;
        let client = client.as_ref().ok_or(DatabaseError::NotConnected)?;

        let rows = client
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND lower(table_name) = lower($1)",
                &[&table],
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_postgres_url() -> Option<String> {
        std::env::var("POSTGRES_URL").ok()
    }

    #[test]
    fn test_numbered_placeholders() {
        assert_eq!(
            numbered_placeholders("UPDATE Teams SET winpercent = ? WHERE tname = ? AND city = ?"),
            "UPDATE Teams SET winpercent = $1 WHERE tname = $2 AND city = $3"
        );
        assert_eq!(
            numbered_placeholders("SELECT '?' FROM t WHERE a = ?"),
            "SELECT '?' FROM t WHERE a = $1"
        );
        assert_eq!(numbered_placeholders("SELECT 1"), "SELECT 1");
    }

    #[tokio::test]
    async fn test_not_connected() {
        let db = PostgresDatabase::new();
        assert!(matches!(
            db.execute("SELECT 1").await,
            Err(DatabaseError::NotConnected)
        ));
        assert!(!db.is_connected());
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test --features postgres -- --ignored
    async fn test_postgres_transaction() -> Result<()> {
        let url = match get_postgres_url() {
            Some(url) => url,
            None => {
                eprintln!("Skipping test: POSTGRES_URL not set");
                return Ok(());
            }
        };

        let db = PostgresDatabase::new();
        db.connect(&url).await?;

        let _ = db.execute("DROP TABLE IF EXISTS test_transaction").await;
        db.execute("CREATE TABLE test_transaction (id integer PRIMARY KEY, age integer, played date)")
            .await?;
        assert!(db.table_exists("TEST_TRANSACTION").await?);

        db.begin_transaction().await?;
        db.execute_with_params(
            "INSERT INTO test_transaction VALUES (?, ?, ?)",
            &[
                DatabaseValue::Int(1),
                DatabaseValue::Null(SqlType::Integer),
                DatabaseValue::Null(SqlType::Date),
            ],
        )
        .await?;
        db.commit().await?;

        db.begin_transaction().await?;
        db.execute("INSERT INTO test_transaction (id) VALUES (2)")
            .await?;
        db.rollback().await?;

        let results = db.query("SELECT * FROM test_transaction").await?;
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].get("age"),
            Some(&DatabaseValue::Null(SqlType::Integer))
        );

        db.execute("DROP TABLE test_transaction").await?;
        Ok(())
    }
}
