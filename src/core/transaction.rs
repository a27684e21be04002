//! Transaction guard for automatic rollback on drop
//!
//! This module provides RAII-style transaction management: one guard is one
//! logical operation, finished by exactly one commit or rollback.

use super::database::Database;
use super::error::{DatabaseError, Result};
use super::statement::Statement;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Transaction guard that rolls back on drop if not committed
///
/// # Example
///
/// ```ignore
/// let tx = TransactionGuard::begin(Arc::clone(&db)).await?;
/// match tx.execute(&stmt).await {
///     Ok(rows) => tx.commit().await?,
///     Err(e) => {
///         tx.rollback().await?;
///         return Err(e);
///     }
/// }
/// ```
pub struct TransactionGuard<D: Database + 'static> {
    db: Arc<D>,
    committed: AtomicBool,
    rolled_back: AtomicBool,
}

impl<D: Database + 'static> TransactionGuard<D> {
    /// Begin a new transaction
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Database is not connected
    /// - A transaction is already active
    /// - Database operation fails
    pub async fn begin(db: Arc<D>) -> Result<Self> {
        db.begin_transaction().await?;

        Ok(Self {
            db,
            committed: AtomicBool::new(false),
            rolled_back: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_committed() {
            return Err(DatabaseError::transaction(
                "Cannot execute on committed transaction",
            ));
        }
        if self.is_rolled_back() {
            return Err(DatabaseError::transaction(
                "Cannot execute on rolled back transaction",
            ));
        }
        Ok(())
    }

    /// Execute a write statement within the transaction
    pub async fn execute(&self, statement: &Statement) -> Result<u64> {
        self.ensure_open()?;
        statement.execute(self.db.as_ref()).await
    }

    /// Execute a parameterless statement (DDL) within the transaction
    pub async fn execute_raw(&self, sql: &str) -> Result<u64> {
        self.ensure_open()?;
        self.db.execute(sql).await
    }

    /// Commit the transaction
    pub async fn commit(self) -> Result<()> {
        if self.is_rolled_back() {
            return Err(DatabaseError::transaction(
                "Cannot commit a rolled back transaction",
            ));
        }

        self.db.commit().await?;
        self.committed.store(true, Ordering::Release);
        Ok(())
    }

    /// Explicitly rollback the transaction
    pub async fn rollback(self) -> Result<()> {
        if self.is_committed() {
            return Err(DatabaseError::transaction(
                "Cannot rollback a committed transaction",
            ));
        }

        // Marked first: a failed ROLLBACK must not queue a second one on drop.
        self.rolled_back.store(true, Ordering::Release);
        self.db.rollback().await
    }

    /// Check if the transaction has been committed
    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }

    /// Check if the transaction has been rolled back
    pub fn is_rolled_back(&self) -> bool {
        self.rolled_back.load(Ordering::Acquire)
    }
}

impl<D: Database + 'static> Drop for TransactionGuard<D> {
    fn drop(&mut self) {
        if self.is_committed() || self.is_rolled_back() {
            return;
        }
        self.rolled_back.store(true, Ordering::Release);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let db = Arc::clone(&self.db);
                handle.spawn(async move {
                    if let Err(e) = db.rollback().await {
                        tracing::error!(error = %e, "auto-rollback of abandoned transaction failed");
                    }
                });
                tracing::warn!("transaction dropped without commit or rollback; rollback queued");
            }
            Err(_) => {
                tracing::warn!(
                    "transaction dropped outside a runtime; it ends when the connection closes"
                );
            }
        }
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::backends::SqliteDatabase;

    async fn test_db() -> Arc<SqliteDatabase> {
        let db = Arc::new(SqliteDatabase::new());
        db.connect(":memory:").await.unwrap();
        db.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)")
            .await
            .unwrap();
        db
    }

    fn insert(id: i32) -> Statement {
        let mut stmt = Statement::new("INSERT INTO test (id, value) VALUES (?, ?)");
        stmt.push(id).unwrap().push("row").unwrap();
        stmt
    }

    #[tokio::test]
    async fn test_transaction_guard_commit() {
        let db = test_db().await;

        let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
        assert!(!tx.is_committed() && !tx.is_rolled_back());
        assert_eq!(tx.execute(&insert(1)).await.unwrap(), 1);
        tx.commit().await.unwrap();

        let results = db.query("SELECT * FROM test").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!db.in_transaction());
    }

    #[tokio::test]
    async fn test_transaction_guard_explicit_rollback() {
        let db = test_db().await;

        let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
        tx.execute(&insert(1)).await.unwrap();
        tx.rollback().await.unwrap();

        let results = db.query("SELECT * FROM test").await.unwrap();
        assert_eq!(results.len(), 0);
        assert!(!db.in_transaction());
    }

    #[tokio::test]
    async fn test_finished_guard_state() {
        let db = test_db().await;

        let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
        tx.committed.store(true, Ordering::Release);
        assert!(tx.is_committed());
        assert!(matches!(
            tx.execute(&insert(1)).await,
            Err(DatabaseError::TransactionError(_))
        ));
        db.commit().await.unwrap();
        drop(tx);

        let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
        tx.rolled_back.store(true, Ordering::Release);
        assert!(tx.is_rolled_back());
        assert!(tx.execute_raw("DELETE FROM test").await.is_err());
        assert!(matches!(
            tx.commit().await,
            Err(DatabaseError::TransactionError(_))
        ));
        db.rollback().await.unwrap();
        assert!(!db.in_transaction());
    }

    #[tokio::test]
    async fn test_transaction_guard_drop_rolls_back() {
        let db = test_db().await;

        {
            let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
            tx.execute(&insert(1)).await.unwrap();
        }

        // Give the queued rollback time to complete
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let results = db.query("SELECT * FROM test").await.unwrap();
        assert_eq!(results.len(), 0);
    }

    #[tokio::test]
    async fn test_failed_statement_then_rollback_keeps_prior_rows() {
        let db = test_db().await;
        let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
        tx.execute(&insert(1)).await.unwrap();
        tx.commit().await.unwrap();

        let tx = TransactionGuard::begin(Arc::clone(&db)).await.unwrap();
        assert!(tx.execute(&insert(1)).await.is_err());
        tx.rollback().await.unwrap();

        let results = db.query("SELECT * FROM test").await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
