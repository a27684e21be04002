//! Positional parameter binding for a single statement
//!
//! A [`Statement`] owns its SQL text and one slot per `?` placeholder. Each
//! slot must be bound exactly once before the statement runs. Optional values
//! are bound as a NULL typed after the column they fill, never as the raw
//! sentinel the caller used to mean "no value".

use super::database::Database;
use super::error::{DatabaseError, Result};
use super::value::{DatabaseResult, DatabaseValue, SqlType};
use chrono::NaiveDate;

/// Byte offsets of every `?` placeholder outside quoted literals and identifiers
pub fn placeholder_positions(sql: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut quote: Option<char> = None;

    for (offset, ch) in sql.char_indices() {
        match (quote, ch) {
            (None, '\'' | '"') => quote = Some(ch),
            (Some(open), c) if c == open => quote = None,
            (None, '?') => positions.push(offset),
            _ => {}
        }
    }

    positions
}

/// A prepared statement with its positional parameter slots
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    placeholders: Vec<usize>,
    slots: Vec<Option<DatabaseValue>>,
    print: bool,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let placeholders = placeholder_positions(&sql);
        let slots = vec![None; placeholders.len()];
        Self {
            sql,
            placeholders,
            slots,
            print: false,
        }
    }

    /// Log the resolved SQL at debug level whenever the statement runs
    pub fn printing(mut self, enabled: bool) -> Self {
        self.print = enabled;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_fully_bound(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Bind the 1-based parameter `index`
    pub fn bind(&mut self, index: usize, value: impl Into<DatabaseValue>) -> Result<&mut Self> {
        let count = self.slots.len();
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.slots.get_mut(i))
            .ok_or_else(|| {
                DatabaseError::parameter(format!(
                    "parameter index {} out of range 1..={}",
                    index, count
                ))
            })?;

        if slot.is_some() {
            return Err(DatabaseError::parameter(format!(
                "parameter {} is already bound",
                index
            )));
        }

        *slot = Some(value.into());
        Ok(self)
    }

    /// Bind a NULL of the given column type
    pub fn bind_null(&mut self, index: usize, sql_type: SqlType) -> Result<&mut Self> {
        self.bind(index, DatabaseValue::Null(sql_type))
    }

    /// Bind the next unbound parameter, in statement order
    pub fn push(&mut self, value: impl Into<DatabaseValue>) -> Result<&mut Self> {
        let next = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| {
                DatabaseError::parameter(format!(
                    "all {} parameters are already bound",
                    self.slots.len()
                ))
            })?;
        self.bind(next + 1, value)
    }

    pub fn push_opt_int(&mut self, value: Option<i32>) -> Result<&mut Self> {
        match value {
            Some(v) => self.push(v),
            None => self.push(DatabaseValue::Null(SqlType::Integer)),
        }
    }

    pub fn push_opt_text(&mut self, value: Option<&str>) -> Result<&mut Self> {
        match value {
            Some(v) => self.push(v),
            None => self.push(DatabaseValue::Null(SqlType::Text)),
        }
    }

    pub fn push_opt_date(&mut self, value: Option<NaiveDate>) -> Result<&mut Self> {
        match value {
            Some(v) => self.push(v),
            None => self.push(DatabaseValue::Null(SqlType::Date)),
        }
    }

    /// Bound parameters in order; fails if any slot is still empty
    pub fn params(&self) -> Result<Vec<DatabaseValue>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.clone().ok_or_else(|| {
                    DatabaseError::parameter(format!("parameter {} is not bound", i + 1))
                })
            })
            .collect()
    }

    /// SQL text with bound parameters substituted as literals
    ///
    /// Unbound slots are left as `?`. The result is for diagnostics only and is
    /// never sent to the database.
    pub fn render(&self) -> String {
        let mut rendered = String::with_capacity(self.sql.len());
        let mut last = 0;

        for (offset, slot) in self.placeholders.iter().zip(&self.slots) {
            rendered.push_str(&self.sql[last..*offset]);
            match slot {
                Some(value) => rendered.push_str(&value.to_sql_literal()),
                None => rendered.push('?'),
            }
            last = offset + 1;
        }

        rendered.push_str(&self.sql[last..]);
        rendered
    }

    fn trace(&self) {
        if self.print {
            tracing::debug!(target: "league_db::sql", "{}", self.render());
        }
    }

    /// Run as a write and return the affected row count
    pub async fn execute<D: Database + ?Sized>(&self, db: &D) -> Result<u64> {
        let params = self.params()?;
        self.trace();
        db.execute_with_params(&self.sql, &params).await
    }

    /// Run as a read and return the rows
    pub async fn query<D: Database + ?Sized>(&self, db: &D) -> Result<DatabaseResult> {
        let params = self.params()?;
        self.trace();
        db.query_with_params(&self.sql, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_skip_quoted_text() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = '?' AND \"c?\" = ?";
        assert_eq!(placeholder_positions(sql).len(), 2);
        assert_eq!(Statement::new(sql).parameter_count(), 2);
    }

    #[test]
    fn test_bind_exactly_once() {
        let mut stmt = Statement::new("UPDATE branch SET branch_name = ? WHERE branch_id = ?");
        stmt.bind(2, 1).unwrap();
        stmt.bind(1, "Main").unwrap();

        assert!(matches!(
            stmt.bind(1, "Again"),
            Err(DatabaseError::ParameterError(_))
        ));
        assert!(matches!(stmt.bind(0, 1), Err(DatabaseError::ParameterError(_))));
        assert!(matches!(stmt.bind(3, 1), Err(DatabaseError::ParameterError(_))));
        assert_eq!(
            stmt.params().unwrap(),
            vec![DatabaseValue::from("Main"), DatabaseValue::Int(1)]
        );
    }

    #[test]
    fn test_unbound_parameter_is_reported() {
        let mut stmt = Statement::new("INSERT INTO Coaches VALUES (?,?,?,?)");
        stmt.push(12345).unwrap().push("Jim Slim").unwrap();

        assert!(!stmt.is_fully_bound());
        let err = stmt.params().unwrap_err();
        assert_eq!(err.to_string(), "Parameter error: parameter 3 is not bound");
    }

    #[test]
    fn test_push_binds_left_to_right_and_fills_gaps() {
        let mut stmt = Statement::new("UPDATE Coaches SET age = ? WHERE clicensenumber = ?");
        stmt.bind(2, 12345).unwrap();
        stmt.push_opt_int(None).unwrap();

        assert_eq!(
            stmt.params().unwrap(),
            vec![DatabaseValue::Null(SqlType::Integer), DatabaseValue::Int(12345)]
        );
        assert!(stmt.push(1).is_err());
    }

    #[test]
    fn test_typed_nulls() {
        let mut stmt = Statement::new("UPDATE Matches SET result = ?, match_date = ? WHERE mid = ?");
        stmt.push_opt_text(None)
            .unwrap()
            .push_opt_date(None)
            .unwrap()
            .push("ASD432")
            .unwrap();

        let params = stmt.params().unwrap();
        assert_eq!(params[0], DatabaseValue::Null(SqlType::Text));
        assert_eq!(params[1], DatabaseValue::Null(SqlType::Date));

        let mut stmt = Statement::new("UPDATE Teams SET win_percent = ? WHERE tname = ?");
        stmt.bind(2, "Chelsea").unwrap();
        stmt.bind_null(1, SqlType::Integer).unwrap();
        assert!(stmt.bind_null(1, SqlType::Integer).is_err());
        assert_eq!(
            stmt.render(),
            "UPDATE Teams SET win_percent = NULL WHERE tname = 'Chelsea'"
        );
    }

    #[test]
    fn test_render_substitutes_literals() {
        let mut stmt = Statement::new("INSERT INTO branch VALUES (?,?,?,?,?)");
        stmt.push(1)
            .unwrap()
            .push("First Branch")
            .unwrap()
            .push("123 Charming Ave")
            .unwrap();

        assert_eq!(
            stmt.render(),
            "INSERT INTO branch VALUES (1,'First Branch','123 Charming Ave',?,?)"
        );

        stmt.push("Vancouver").unwrap().push_opt_int(None).unwrap();
        assert_eq!(
            stmt.render(),
            "INSERT INTO branch VALUES (1,'First Branch','123 Charming Ave','Vancouver',NULL)"
        );
    }
}
