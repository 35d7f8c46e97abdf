//! In-memory representation of query output.
//!
//! A [`TabularResult`] is the complete output of one query: an ordered list
//! of [`Row`]s that all share the same column names in the same order. The
//! first row's columns define the layout; rows are produced wholesale by a
//! query executor and consumed once by the CSV serializer.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// A single column value with its runtime type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Character data (also used for UUID, JSON and enum values)
    Text(String),
    /// Any integer type
    Integer(i64),
    /// Single or double precision floating point
    Float(f64),
    /// Boolean
    Boolean(bool),
    /// Arbitrary precision numeric, kept as its exact decimal text
    Decimal(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day without zone
    Time(NaiveTime),
    /// Timestamp without zone
    Timestamp(NaiveDateTime),
    /// Timestamp with zone, normalized to UTC
    TimestampTz(DateTime<Utc>),
    /// Raw bytes
    Binary(Vec<u8>),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One result row: column names paired with values, in column order.
///
/// Column names are not checked for uniqueness; duplicates are kept in
/// their positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty row with room for `columns` cells.
    pub fn with_capacity(columns: usize) -> Self {
        Self {
            cells: Vec::with_capacity(columns),
        }
    }

    /// Appends a column.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.push((column.into(), value.into()));
    }

    /// Builder form of [`Row::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|(_, value)| value)
    }

    /// First value stored under `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    fn has_same_columns(&self, other: &Self) -> bool {
        self.len() == other.len() && self.column_names().eq(other.column_names())
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Complete, ordered output of one query.
///
/// # Invariant
/// Every row has the same column names, in the same order, as the first
/// row. [`TabularResult::push`] enforces this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularResult {
    rows: Vec<Row>,
}

impl TabularResult {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty result with room for `rows` rows.
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            rows: Vec::with_capacity(rows),
        }
    }

    /// Builds a result from rows, checking the column layout.
    ///
    /// # Errors
    /// Returns [`crate::ExportError::InconsistentColumns`] for the first row
    /// whose columns differ from the first row's.
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> crate::Result<Self> {
        let mut result = Self::new();
        for row in rows {
            result.push(row)?;
        }
        Ok(result)
    }

    /// Appends a row.
    ///
    /// # Errors
    /// Returns [`crate::ExportError::InconsistentColumns`] when the row's
    /// columns differ from the first row's.
    pub fn push(&mut self, row: Row) -> crate::Result<()> {
        if let Some(first) = self.rows.first()
            && !first.has_same_columns(&row)
        {
            return Err(crate::ExportError::InconsistentColumns {
                row_index: self.rows.len(),
                expected: first.column_names().collect::<Vec<_>>().join(", "),
                found: row.column_names().collect::<Vec<_>>().join(", "),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names of the first row, or nothing for an empty result.
    pub fn column_names(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.column_names().collect())
            .unwrap_or_default()
    }

    /// Rows in query order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the query returned no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
