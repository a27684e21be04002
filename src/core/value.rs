//! Database value types
//!
//! This module defines the values bound to statements and read back from rows.
//! A NULL always carries the SQL type of the column it stands in for, so a
//! backend can hand the driver a correctly typed NULL.

use super::error::{DatabaseError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Date format used when a date travels as text
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared SQL type of a column, used as the typed NULL marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Integer,
    Double,
    Text,
    Date,
}

/// Database value that can hold different types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// Null value of the given column type
    Null(SqlType),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit floating point
    Double(f64),
    /// Text value
    Text(String),
    /// Calendar date
    Date(NaiveDate),
}

impl DatabaseValue {
    /// Get the value as an i32
    pub fn as_int(&self) -> Option<i32> {
        match self {
            DatabaseValue::Int(v) => Some(*v),
            DatabaseValue::Long(v) => i32::try_from(*v).ok(),
            DatabaseValue::Double(v) => Some(*v as i32),
            DatabaseValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an i64
    pub fn as_long(&self) -> Option<i64> {
        match self {
            DatabaseValue::Long(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v as i64),
            DatabaseValue::Double(v) => Some(*v as i64),
            DatabaseValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an f64
    pub fn as_double(&self) -> Option<f64> {
        match self {
            DatabaseValue::Double(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v as f64),
            DatabaseValue::Long(v) => Some(*v as f64),
            DatabaseValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get the value as a string slice (zero-copy for Text values)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the value as a date; text is parsed as `YYYY-MM-DD`
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DatabaseValue::Date(d) => Some(*d),
            DatabaseValue::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok(),
            _ => None,
        }
    }

    /// Get the value as a string (with conversion)
    pub fn as_string(&self) -> String {
        match self {
            DatabaseValue::Null(_) => "null".to_string(),
            DatabaseValue::Int(v) => v.to_string(),
            DatabaseValue::Long(v) => v.to_string(),
            DatabaseValue::Double(v) => v.to_string(),
            DatabaseValue::Text(s) => s.clone(),
            DatabaseValue::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }

    /// Render the value as a SQL literal, for diagnostics only
    pub fn to_sql_literal(&self) -> String {
        match self {
            DatabaseValue::Null(_) => "NULL".to_string(),
            DatabaseValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DatabaseValue::Date(d) => format!("'{}'", d.format(DATE_FORMAT)),
            other => other.as_string(),
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null(_))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null(_) => "null",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::Text(_) => "text",
            DatabaseValue::Date(_) => "date",
        }
    }
}

impl From<i32> for DatabaseValue {
    fn from(v: i32) -> Self {
        DatabaseValue::Int(v)
    }
}

impl From<i64> for DatabaseValue {
    fn from(v: i64) -> Self {
        DatabaseValue::Long(v)
    }
}

impl From<f64> for DatabaseValue {
    fn from(v: f64) -> Self {
        DatabaseValue::Double(v)
    }
}

impl From<String> for DatabaseValue {
    fn from(v: String) -> Self {
        DatabaseValue::Text(v)
    }
}

impl From<&str> for DatabaseValue {
    fn from(v: &str) -> Self {
        DatabaseValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for DatabaseValue {
    fn from(v: NaiveDate) -> Self {
        DatabaseValue::Date(v)
    }
}

/// A row of database results (column name -> value mapping)
pub type DatabaseRow = HashMap<String, DatabaseValue>;

/// Multiple rows returned from a query
pub type DatabaseResult = Vec<DatabaseRow>;

/// Typed column access on a [`DatabaseRow`]
///
/// The `opt_*` getters map a stored NULL to `None`; the plain getters treat
/// NULL as a type mismatch.
pub trait RowExt {
    fn value(&self, column: &str) -> Result<&DatabaseValue>;

    fn int(&self, column: &str) -> Result<i32> {
        self.opt_int(column)?
            .ok_or_else(|| DatabaseError::type_mismatch("integer", "null"))
    }

    fn opt_int(&self, column: &str) -> Result<Option<i32>> {
        let value = self.value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_int()
            .map(Some)
            .ok_or_else(|| DatabaseError::type_mismatch("integer", value.type_name()))
    }

    fn opt_double(&self, column: &str) -> Result<Option<f64>> {
        let value = self.value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_double()
            .map(Some)
            .ok_or_else(|| DatabaseError::type_mismatch("double", value.type_name()))
    }

    fn text(&self, column: &str) -> Result<String> {
        self.opt_text(column)?
            .ok_or_else(|| DatabaseError::type_mismatch("text", "null"))
    }

    fn opt_text(&self, column: &str) -> Result<Option<String>> {
        match self.value(column)? {
            DatabaseValue::Null(_) => Ok(None),
            DatabaseValue::Text(s) => Ok(Some(s.clone())),
            other => Err(DatabaseError::type_mismatch("text", other.type_name())),
        }
    }

    fn opt_date(&self, column: &str) -> Result<Option<NaiveDate>> {
        let value = self.value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_date()
            .map(Some)
            .ok_or_else(|| DatabaseError::type_mismatch("date", value.type_name()))
    }
}

impl RowExt for DatabaseRow {
    fn value(&self, column: &str) -> Result<&DatabaseValue> {
        self.get(column)
            .ok_or_else(|| DatabaseError::ColumnNotFound(column.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        let val = DatabaseValue::Int(42);
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.as_long(), Some(42));
        assert_eq!(val.as_string(), "42");

        let val = DatabaseValue::Long(175);
        assert_eq!(val.as_int(), Some(175));

        let val = DatabaseValue::Long(i64::MAX);
        assert_eq!(val.as_int(), None);

        let val = DatabaseValue::Text("2017-01-01".to_string());
        assert_eq!(val.as_date(), NaiveDate::from_ymd_opt(2017, 1, 1));
    }

    #[test]
    fn test_null_carries_type() {
        let val = DatabaseValue::Null(SqlType::Date);
        assert!(val.is_null());
        assert_eq!(val.type_name(), "null");
        assert_eq!(val.as_int(), None);
        assert_eq!(val.to_sql_literal(), "NULL");
    }

    #[test]
    fn test_sql_literal_escapes_quotes() {
        let val = DatabaseValue::from("O'Brien");
        assert_eq!(val.to_sql_literal(), "'O''Brien'");

        let date = NaiveDate::from_ymd_opt(1997, 12, 5).unwrap();
        assert_eq!(DatabaseValue::from(date).to_sql_literal(), "'1997-12-05'");
    }

    #[test]
    fn test_row_ext_reads_nulls_as_none() {
        let mut row = DatabaseRow::new();
        row.insert("age".to_string(), DatabaseValue::Null(SqlType::Integer));
        row.insert("height".to_string(), DatabaseValue::Long(180));
        row.insert("pname".to_string(), DatabaseValue::from("Jay Gray"));

        assert_eq!(row.opt_int("age").unwrap(), None);
        assert_eq!(row.int("height").unwrap(), 180);
        assert_eq!(row.text("pname").unwrap(), "Jay Gray");
        assert!(row.int("age").is_err());
        assert!(matches!(
            row.int("weight"),
            Err(DatabaseError::ColumnNotFound(_))
        ));
        assert!(matches!(
            row.opt_text("height"),
            Err(DatabaseError::TypeMismatch { .. })
        ));
    }
}
