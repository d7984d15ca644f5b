//! Named-field records exchanged with concepts.
//!
//! A record is the argument of an action, the result of an action, or one
//! row of a query result. Fields iterate in name order.

use std::fmt;
use std::sync::Arc;

use crate::collections::SortedMap;
use crate::value::Value;

/// Field name that marks a record as a failed action result.
pub const ERROR_FIELD: &str = "error";

/// An immutable mapping from field names to values.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    fields: SortedMap<Arc<str>, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error-shaped record: `{error: message}`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new().with(ERROR_FIELD, message.into())
    }

    /// Returns a new record with the field set.
    #[must_use]
    pub fn with(&self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        Self {
            fields: self.fields.insert(name.into(), value.into()),
        }
    }

    /// Returns a new record without the field.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        Self {
            fields: self.fields.remove(name),
        }
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Gets a field as a string slice.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns true if this is an error-shaped record.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.contains(ERROR_FIELD)
    }

    /// Returns the error message of an error-shaped record.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.get_str(ERROR_FIELD)
    }

    /// Returns a record containing the fields of both; `other` wins on clashes.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            fields: self.fields.overlay(&other.fields),
        }
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts into a map value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Map(self.fields)
    }

    /// Builds a record from a map value; other values yield `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_map().map(|fields| Self {
            fields: fields.clone(),
        })
    }
}

impl<K: Into<Arc<str>>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v:?}")?;
        }
        write!(f, "}}")
    }
}

/// Builds a [`Record`] from `name => value` pairs.
///
/// ```
/// use concord_foundation::record;
/// let r = record! { "email" => "a@b.c", "name" => "Ada" };
/// assert_eq!(r.get_str("name"), Some("Ada"));
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with($name, $value))+
    };
}
