//! Sports-league data access
//!
//! Record types, the schema and its seed dataset, the connection handler that
//! runs every write as its own transaction, and read-only reports.

pub mod handler;
pub mod records;
pub mod reports;
pub mod schema;

pub use handler::{ConnectionHandler, WriteOutcome};
#[cfg(feature = "postgres")]
pub use handler::PostgresHandler;
#[cfg(feature = "sqlite")]
pub use handler::SqliteHandler;
pub use records::{Branch, City, Coach, Livestream, Match, Player, Record, Team, TvBroadcaster};
pub use reports::{CoachAttribute, TeamMatchCount};
pub use schema::{BootstrapReport, SetupWarning};
