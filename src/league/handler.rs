//! Connection handler for the league schema
//!
//! The handler owns one backend connection for its lifetime. Every write is
//! one transaction that ends in exactly one commit or rollback; reads run
//! without a transaction boundary.

use super::records::{
    nullable, sentinel, Branch, City, Coach, Livestream, Match, Player, Record, Team,
    TvBroadcaster,
};
use super::schema::{seed_data, BootstrapReport, CREATE_BRANCH, FIXED_TABLES, RECREATED_TABLE};
use crate::core::{
    ConnectionConfig, Database, DatabaseError, DatabaseResult, Result, Statement,
    TransactionGuard,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument::{Instrument, WithSubscriber};

/// Result of a write that executed without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOutcome {
    Applied { rows: u64 },
    /// No row matched the key; the transaction still committed
    NotFound,
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WriteOutcome::NotFound)
    }

    pub fn rows(&self) -> u64 {
        match self {
            WriteOutcome::Applied { rows } => *rows,
            WriteOutcome::NotFound => 0,
        }
    }
}

/// Single-session data-access handler over one backend connection
pub struct ConnectionHandler<D: Database + Default + 'static> {
    db: Arc<D>,
    config: ConnectionConfig,
}

#[cfg(feature = "sqlite")]
pub type SqliteHandler = ConnectionHandler<crate::backends::SqliteDatabase>;

#[cfg(feature = "postgres")]
pub type PostgresHandler = ConnectionHandler<crate::backends::PostgresDatabase>;

impl<D: Database + Default + 'static> ConnectionHandler<D> {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            db: Arc::new(D::default()),
            config,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The underlying backend, for raw statements outside the entity API
    pub fn database(&self) -> &Arc<D> {
        &self.db
    }

    /// Open a connection to the configured endpoint, closing any prior one
    ///
    /// # Errors
    ///
    /// `ConnectionError` on authentication or network failure, or when the
    /// configuration names a different backend than this handler drives.
    pub async fn connect(&self, username: &str, password: &str) -> Result<()> {
        self.close().await?;

        let endpoint = self.config.endpoint();
        if self.config.db_type != self.db.database_type() {
            let e = DatabaseError::connection(format!(
                "configured for {} but handler drives {}",
                self.config.db_type,
                self.db.database_type()
            ));
            tracing::error!(%endpoint, error = %e, "connect failed");
            return Err(e);
        }

        let connection_string = self
            .config
            .connection_string(username, password)
            .inspect_err(|e| tracing::error!(%endpoint, error = %e, "connect failed"))?;

        if !self.config.db_type.authenticates() {
            tracing::debug!(%endpoint, username, "backend has no authentication; credentials ignored");
        }

        match self.db.connect(&connection_string).await {
            Ok(()) => {
                tracing::info!(%endpoint, username, "connected");
                Ok(())
            }
            Err(e) => {
                tracing::error!(%endpoint, username, error = %e, "connect failed");
                Err(e)
            }
        }
    }

    /// Release the connection; closing an already closed handler succeeds
    ///
    /// The backend is always asked to disconnect, since `is_connected` may
    /// report false while another task holds the connection.
    pub async fn close(&self) -> Result<()> {
        let was_connected = self.db.is_connected();

        self.db
            .disconnect()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "close failed"))?;
        if was_connected {
            tracing::info!(endpoint = %self.config.endpoint(), "connection closed");
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.db.is_connected()
    }

    pub(super) fn statement(&self, sql: impl Into<String>) -> Statement {
        Statement::new(sql).printing(self.config.print_statements)
    }

    /// Build a statement and bind its parameters in one step
    pub(super) fn prepare<F>(&self, sql: &str, bind: F) -> Result<Statement>
    where
        F: FnOnce(&mut Statement) -> Result<()>,
    {
        let mut statement = self.statement(sql);
        bind(&mut statement)
            .inspect_err(|e| tracing::error!(sql, error = %e, "parameter binding failed"))?;
        Ok(statement)
    }

    /// Run one write as its own transaction
    ///
    /// The transaction runs on its own task, so dropping the returned future
    /// cannot strand the session between BEGIN and COMMIT.
    async fn write(&self, subject: &str, statement: &Statement) -> Result<WriteOutcome> {
        let db = Arc::clone(&self.db);
        let subject = subject.to_string();
        let statement = statement.clone();

        detach(async move { write_transaction(db, &subject, &statement).await }).await
    }

    /// Run one read; no transaction and no rollback
    pub(super) async fn read(&self, subject: &str, statement: &Statement) -> Result<DatabaseResult> {
        statement
            .query(self.db.as_ref())
            .await
            .inspect_err(|e| tracing::error!(subject, error = %e, "query failed"))
    }

    async fn insert_record<R: Record>(&self, record: &R) -> Result<WriteOutcome> {
        let statement = self.prepare(&R::insert_sql(), |s| record.bind(s))?;
        self.write(&record.key(), &statement).await
    }

    async fn list_records<R: Record>(&self) -> Result<Vec<R>> {
        let rows = self.read(R::TABLE, &self.statement(R::select_sql())).await?;
        rows.iter()
            .map(R::from_row)
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| tracing::error!(table = R::TABLE, error = %e, "row mapping failed"))
    }

    // Branch

    pub async fn insert_branch(&self, branch: &Branch) -> Result<WriteOutcome> {
        self.insert_record(branch).await
    }

    pub async fn delete_branch(&self, branch_id: i32) -> Result<WriteOutcome> {
        let statement = self.prepare("DELETE FROM branch WHERE branch_id = ?", |s| {
            s.push(branch_id).map(|_| ())
        })?;
        self.write(&format!("Branch {}", branch_id), &statement).await
    }

    pub async fn update_branch_name(&self, branch_id: i32, name: &str) -> Result<WriteOutcome> {
        let statement = self.prepare(
            "UPDATE branch SET branch_name = ? WHERE branch_id = ?",
            |s| s.push(name)?.push(branch_id).map(|_| ()),
        )?;
        self.write(&format!("Branch {}", branch_id), &statement).await
    }

    pub async fn list_branches(&self) -> Result<Vec<Branch>> {
        self.list_records().await
    }

    // City

    pub async fn insert_city(&self, city: &City) -> Result<WriteOutcome> {
        self.insert_record(city).await
    }

    pub async fn delete_city(&self, city: &str) -> Result<WriteOutcome> {
        let statement =
            self.prepare("DELETE FROM Cities WHERE city = ?", |s| s.push(city).map(|_| ()))?;
        self.write(&format!("City {}", city), &statement).await
    }

    pub async fn list_cities(&self) -> Result<Vec<City>> {
        self.list_records().await
    }

    // Coach

    pub async fn insert_coach(&self, coach: &Coach) -> Result<WriteOutcome> {
        self.insert_record(coach).await
    }

    pub async fn delete_coach(&self, license_number: i32) -> Result<WriteOutcome> {
        let statement = self.prepare("DELETE FROM Coaches WHERE clicensenumber = ?", |s| {
            s.push(license_number).map(|_| ())
        })?;
        self.write(&format!("Coach {}", license_number), &statement)
            .await
    }

    /// `age` of 0 clears the stored age
    pub async fn update_coach_age(&self, license_number: i32, age: i32) -> Result<WriteOutcome> {
        let statement = self.prepare(
            "UPDATE Coaches SET age = ? WHERE clicensenumber = ?",
            |s| {
                s.push_opt_int(nullable(age, sentinel::COACH_AGE))?
                    .push(license_number)
                    .map(|_| ())
            },
        )?;
        self.write(&format!("Coach {}", license_number), &statement)
            .await
    }

    pub async fn list_coaches(&self) -> Result<Vec<Coach>> {
        self.list_records().await
    }

    // Team

    pub async fn insert_team(&self, team: &Team) -> Result<WriteOutcome> {
        self.insert_record(team).await
    }

    pub async fn delete_team(&self, name: &str, city: &str) -> Result<WriteOutcome> {
        let statement = self.prepare("DELETE FROM Teams WHERE tname = ? AND city = ?", |s| {
            s.push(name)?.push(city).map(|_| ())
        })?;
        self.write(&format!("Team {} in {}", name, city), &statement)
            .await
    }

    /// `win_percent` of -1 clears the stored percentage
    pub async fn update_team_win_percent(
        &self,
        name: &str,
        city: &str,
        win_percent: i32,
    ) -> Result<WriteOutcome> {
        let statement = self.prepare(
            "UPDATE Teams SET winpercent = ? WHERE tname = ? AND city = ?",
            |s| {
                s.push_opt_int(nullable(win_percent, sentinel::TEAM_WIN_PERCENT))?
                    .push(name)?
                    .push(city)
                    .map(|_| ())
            },
        )?;
        self.write(&format!("Team {} in {}", name, city), &statement)
            .await
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>> {
        self.list_records().await
    }

    // Player

    pub async fn insert_player(&self, player: &Player) -> Result<WriteOutcome> {
        self.insert_record(player).await
    }

    pub async fn delete_player(
        &self,
        jersey_number: i32,
        team: &str,
        city: &str,
    ) -> Result<WriteOutcome> {
        let statement = self.prepare(
            "DELETE FROM Players WHERE jerseynumber = ? AND tname = ? AND city = ?",
            |s| s.push(jersey_number)?.push(team)?.push(city).map(|_| ()),
        )?;
        self.write(
            &format!("Player {} in team {} in {}", jersey_number, team, city),
            &statement,
        )
        .await
    }

    /// Rename a player and set their age; `age` of -1 clears the stored age
    pub async fn update_player(
        &self,
        jersey_number: i32,
        team: &str,
        city: &str,
        name: &str,
        age: i32,
    ) -> Result<WriteOutcome> {
        let statement = self.prepare(
            "UPDATE Players SET pname = ?, age = ? \
             WHERE jerseynumber = ? AND tname = ? AND city = ?",
            |s| {
                s.push(name)?
                    .push_opt_int(nullable(age, sentinel::PLAYER_AGE))?
                    .push(jersey_number)?
                    .push(team)?
                    .push(city)
                    .map(|_| ())
            },
        )?;
        self.write(
            &format!("Player {} in team {} in {}", jersey_number, team, city),
            &statement,
        )
        .await
    }

    pub async fn list_players(&self) -> Result<Vec<Player>> {
        self.list_records().await
    }

    // Match

    pub async fn insert_match(&self, m: &Match) -> Result<WriteOutcome> {
        self.insert_record(m).await
    }

    pub async fn delete_match(&self, match_id: &str) -> Result<WriteOutcome> {
        let statement = self.prepare("DELETE FROM Matches WHERE mid = ?", |s| {
            s.push(match_id).map(|_| ())
        })?;
        self.write(&format!("Match {}", match_id), &statement).await
    }

    pub async fn update_match_result(
        &self,
        match_id: &str,
        result: Option<&str>,
    ) -> Result<WriteOutcome> {
        let statement = self.prepare("UPDATE Matches SET result = ? WHERE mid = ?", |s| {
            s.push_opt_text(result)?.push(match_id).map(|_| ())
        })?;
        self.write(&format!("Match {}", match_id), &statement).await
    }

    pub async fn update_match_date(
        &self,
        match_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<WriteOutcome> {
        let statement = self.prepare("UPDATE Matches SET match_date = ? WHERE mid = ?", |s| {
            s.push_opt_date(date)?.push(match_id).map(|_| ())
        })?;
        self.write(&format!("Match {}", match_id), &statement).await
    }

    pub async fn list_matches(&self) -> Result<Vec<Match>> {
        self.list_records().await
    }

    // TV broadcaster

    pub async fn insert_broadcaster(&self, broadcaster: &TvBroadcaster) -> Result<WriteOutcome> {
        self.insert_record(broadcaster).await
    }

    pub async fn delete_broadcaster(&self, name: &str, country: &str) -> Result<WriteOutcome> {
        let statement = self.prepare("DELETE FROM TV WHERE bname = ? AND country = ?", |s| {
            s.push(name)?.push(country).map(|_| ())
        })?;
        self.write(&format!("Broadcaster {} ({})", name, country), &statement)
            .await
    }

    pub async fn list_broadcasters(&self) -> Result<Vec<TvBroadcaster>> {
        self.list_records().await
    }

    // Livestream

    pub async fn insert_livestream(&self, livestream: &Livestream) -> Result<WriteOutcome> {
        self.insert_record(livestream).await
    }

    pub async fn delete_livestream(
        &self,
        broadcaster: &str,
        country: &str,
        match_id: &str,
    ) -> Result<WriteOutcome> {
        let statement = self.prepare(
            "DELETE FROM Livestreams WHERE bname = ? AND country = ? AND mid = ?",
            |s| s.push(broadcaster)?.push(country)?.push(match_id).map(|_| ()),
        )?;
        self.write(
            &format!("Livestream of {} by {} ({})", match_id, broadcaster, country),
            &statement,
        )
        .await
    }

    pub async fn list_livestreams(&self) -> Result<Vec<Livestream>> {
        self.list_records().await
    }

    // Bootstrap

    /// Run one DDL statement as its own transaction
    async fn run_ddl(&self, sql: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let sql = sql.to_string();
        let print = self.config.print_statements;

        detach(async move {
            let tx = TransactionGuard::begin(db).await?;
            if print {
                tracing::debug!(target: "league_db::sql", "{}", sql);
            }

            match tx.execute_raw(&sql).await {
                Ok(_) => tx.commit().await,
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::error!(error = %rollback_err, "rollback after DDL failure failed");
                    }
                    Err(e)
                }
            }
        })
        .await
    }

    async fn seed<R: Record>(&self, report: &mut BootstrapReport, records: &[R]) {
        for record in records {
            report.seeded(self.insert_record(record).await.is_ok());
        }
    }

    /// Create the schema and load the seed dataset
    ///
    /// `branch` is dropped and recreated on every call. The other tables are
    /// created in dependency order; a table that cannot be created (usually
    /// because it already exists) is recorded as a warning and setup goes on.
    /// Seed rows go through the regular insert path, so a re-run reports
    /// duplicate-key failures for every table except `branch`.
    ///
    /// # Errors
    ///
    /// Only `NotConnected` and failures of the existence check abort the run.
    pub async fn bootstrap_schema(&self) -> Result<BootstrapReport> {
        let mut report = BootstrapReport::default();

        let exists = self
            .db
            .table_exists(RECREATED_TABLE)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "bootstrap aborted"))?;
        if exists {
            if let Err(e) = self.run_ddl(&format!("DROP TABLE {}", RECREATED_TABLE)).await {
                report.warn(RECREATED_TABLE, e.to_string());
            }
        }

        let tables =
            std::iter::once((RECREATED_TABLE, CREATE_BRANCH)).chain(FIXED_TABLES.iter().copied());
        for (table, ddl) in tables {
            match self.run_ddl(ddl).await {
                Ok(()) => report.tables_created.push(table.to_string()),
                Err(e) => report.warn(table, e.to_string()),
            }
        }

        let seeds = seed_data();
        self.seed(&mut report, &seeds.branches).await;
        self.seed(&mut report, &seeds.cities).await;
        self.seed(&mut report, &seeds.coaches).await;
        self.seed(&mut report, &seeds.teams).await;
        self.seed(&mut report, &seeds.players).await;
        self.seed(&mut report, &seeds.matches).await;
        self.seed(&mut report, &seeds.broadcasters).await;
        self.seed(&mut report, &seeds.livestreams).await;

        tracing::info!(
            created = report.tables_created.len(),
            warnings = report.warnings.len(),
            seeded = report.seeds_inserted,
            seed_failures = report.seeds_failed,
            "schema bootstrap finished"
        );
        Ok(report)
    }
}

/// Run a transaction to completion on its own task and wait for it
async fn detach<T, F>(transaction: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(transaction.in_current_span().with_current_subscriber())
        .await
        .map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
}

async fn write_transaction<D: Database + 'static>(
    db: Arc<D>,
    subject: &str,
    statement: &Statement,
) -> Result<WriteOutcome> {
    let tx = TransactionGuard::begin(db)
        .await
        .inspect_err(|e| tracing::error!(subject, error = %e, "could not begin transaction"))?;

    match tx.execute(statement).await {
        Ok(rows) => {
            tx.commit()
                .await
                .inspect_err(|e| tracing::error!(subject, error = %e, "commit failed"))?;
            if rows == 0 {
                tracing::warn!("{} does not exist", subject);
                Ok(WriteOutcome::NotFound)
            } else {
                Ok(WriteOutcome::Applied { rows })
            }
        }
        Err(e) => {
            tracing::error!(subject, error = %e, "write failed; rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(subject, error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}
