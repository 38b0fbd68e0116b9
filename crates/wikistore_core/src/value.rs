//! Column values and rows.

use crate::schema::ColumnType;
use crate::types::ColumnId;
use serde::{Deserialize, Serialize};

/// A single column value.
///
/// `DateTime` holds microseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Absent value.
    Null,
    /// 64-bit integer.
    Long(i64),
    /// UTF-8 text (both `Text` and `LongText` columns).
    Text(String),
    /// UTC timestamp in microseconds.
    DateTime(i64),
}

impl Value {
    /// Returns true if this is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value may be stored in a column of type `ty`.
    #[must_use]
    pub fn fits(&self, ty: ColumnType) -> bool {
        matches!(
            (self, ty),
            (Self::Null, _)
                | (Self::Long(_), ColumnType::Long)
                | (Self::Text(_), ColumnType::Text | ColumnType::LongText)
                | (Self::DateTime(_), ColumnType::DateTime)
        )
    }

    /// Integer payload, if any.
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Timestamp payload, if any.
    #[must_use]
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            Self::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

/// A table row: one value per column, in column-definition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Vec<Value>);

impl Row {
    /// Creates a row of `width` nulls.
    #[must_use]
    pub fn empty(width: usize) -> Self {
        Self(vec![Value::Null; width])
    }

    /// Creates a row from values.
    #[must_use]
    pub fn from_values(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Value of a column; `Null` if out of range.
    #[must_use]
    pub fn get(&self, column: ColumnId) -> &Value {
        self.0.get(column.slot()).unwrap_or(&Value::Null)
    }

    /// Sets a column value. Out-of-range columns are ignored.
    pub fn set(&mut self, column: ColumnId, value: Value) {
        if let Some(slot) = self.0.get_mut(column.slot()) {
            *slot = value;
        }
    }

    /// Builder form of [`Row::set`].
    #[must_use]
    pub fn with(mut self, column: ColumnId, value: Value) -> Self {
        self.set(column, value);
        self
    }

    /// All values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}
