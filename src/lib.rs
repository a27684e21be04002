//! # League Database
//!
//! A transactional data-access layer for a sports-league schema: branches,
//! cities, teams, players, coaches, matches, TV broadcasters and livestreams.
//!
//! The crate is split into three layers:
//!
//! - [`core`](crate::core): the backend trait, connection configuration, values with typed
//!   NULLs, the positional statement binder and the transaction guard
//! - [`backends`](crate::backends): SQLite (default feature) and PostgreSQL (`postgres` feature)
//! - [`league`](crate::league): record types, schema bootstrap and the [`ConnectionHandler`]
//!   that runs every write as exactly one commit or rollback
//!
//! ## Features
//!
//! - **Explicit nulls**: optional fields are `Option`s; the per-field
//!   sentinels callers pass (`0`, `-1`) become NULL at record construction
//! - **One transaction per write**: failures roll back and leave the table
//!   unchanged; a write matching no row is a committed [`WriteOutcome::NotFound`]
//! - **Schema bootstrap**: recreates `branch`, creates the remaining tables in
//!   foreign-key order and loads a seed dataset through the normal insert path
//! - **Statement printing**: resolved SQL is logged through `tracing` under the
//!   `league_db::sql` target when enabled
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use league_db::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let handler = SqliteHandler::new(ConnectionConfig::sqlite_memory());
//!     handler.connect("league", "secret").await?;
//!
//!     let report = handler.bootstrap_schema().await?;
//!     assert!(report.warnings.is_empty());
//!
//!     // Phone 0 means "no phone" and is stored as NULL
//!     let branch = Branch::new(3, "Third Branch", "9 Main St", "Vancouver", 0);
//!     handler.insert_branch(&branch).await?;
//!
//!     for branch in handler.list_branches().await? {
//!         println!("{} {:?}", branch.name, branch.phone);
//!     }
//!
//!     if handler.delete_coach(99999).await?.is_not_found() {
//!         println!("no such coach");
//!     }
//!
//!     handler.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Configuration from the environment
//!
//! ```rust,no_run
//! use league_db::prelude::*;
//!
//! # fn main() -> Result<()> {
//! // LEAGUE_DB_TYPE=postgres LEAGUE_DB_HOST=db LEAGUE_DB_NAME=league
//! let config = ConnectionConfig::from_env()?;
//! println!("connecting to {}", config.endpoint());
//! # Ok(())
//! # }
//! ```

/// Core database system types and traits
pub mod core;

/// Database backend implementations
pub mod backends;

/// League records, schema and connection handler
pub mod league;

/// Prelude for convenient imports
///
/// ```rust
/// use league_db::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let handler = SqliteHandler::new(ConnectionConfig::sqlite_memory());
///     handler.connect("user", "password").await?;
///     Ok(())
/// }
/// ```
pub mod prelude {
    pub use crate::core::{
        ConnectionBuilder, ConnectionConfig, Database, DatabaseError, DatabaseResult,
        DatabaseRow, DatabaseType, DatabaseValue, Result, RowExt, SqlType, Statement,
        TransactionGuard,
    };
    pub use crate::league::{
        BootstrapReport, Branch, City, Coach, CoachAttribute, ConnectionHandler, Livestream,
        Match, Player, Team, TeamMatchCount, TvBroadcaster, WriteOutcome,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::backends::SqliteDatabase;
    #[cfg(feature = "sqlite")]
    pub use crate::league::SqliteHandler;

    #[cfg(feature = "postgres")]
    pub use crate::backends::PostgresDatabase;
    #[cfg(feature = "postgres")]
    pub use crate::league::PostgresHandler;
}

// Re-export at root level for convenience
pub use crate::core::{
    ConnectionBuilder, ConnectionConfig, Database, DatabaseError, DatabaseResult, DatabaseRow,
    DatabaseType, DatabaseValue, Result, SqlType, Statement, TransactionGuard,
};
pub use crate::league::{ConnectionHandler, WriteOutcome};

#[cfg(feature = "sqlite")]
pub use crate::backends::SqliteDatabase;

#[cfg(feature = "postgres")]
pub use crate::backends::PostgresDatabase;
