//! Index key construction.

use crate::schema::SortOrder;
use crate::value::Value;
use std::cmp::Reverse;

/// Longest text prefix, in characters, that takes part in a key.
///
/// Longer values are truncated before comparison, so two texts sharing
/// this prefix collide in the key. Only non-unique indexes over long text
/// columns are affected.
pub const TEXT_KEY_LIMIT: usize = 255;

/// One segment of an index key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPart {
    /// Ascending segment.
    Asc(Value),
    /// Descending segment.
    Desc(Reverse<Value>),
}

impl KeyPart {
    /// Builds a segment from a column value.
    #[must_use]
    pub fn new(value: Value, order: SortOrder) -> Self {
        let value = match value {
            Value::Text(text) if text.chars().count() > TEXT_KEY_LIMIT => {
                Value::Text(text.chars().take(TEXT_KEY_LIMIT).collect())
            }
            other => other,
        };
        match order {
            SortOrder::Ascending => Self::Asc(value),
            SortOrder::Descending => Self::Desc(Reverse(value)),
        }
    }

    /// The underlying value.
    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            Self::Asc(v) | Self::Desc(Reverse(v)) => v,
        }
    }
}

/// A composite index key, ordered segment by segment.
///
/// A key that is a strict prefix of another sorts before it, so every key
/// starting with `prefix` is found by scanning forward from `prefix` while
/// [`IndexKey::starts_with`] holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey(Vec<KeyPart>);

impl IndexKey {
    /// Creates a key from segments.
    #[must_use]
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// Single ascending segment.
    #[must_use]
    pub fn asc(value: Value) -> Self {
        Self(vec![KeyPart::new(value, SortOrder::Ascending)])
    }

    /// Appends an ascending segment.
    #[must_use]
    pub fn then_asc(mut self, value: Value) -> Self {
        self.0.push(KeyPart::new(value, SortOrder::Ascending));
        self
    }

    /// Segments of the key.
    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Whether this key begins with every segment of `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &IndexKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Whether any segment holds `Null`.
    #[must_use]
    pub fn has_null(&self) -> bool {
        self.0.iter().any(|p| p.value().is_null())
    }
}
