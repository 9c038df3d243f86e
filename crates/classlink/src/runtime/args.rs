//! Constructor arguments.
//!
//! A constructor chain reads its arguments in order: the root constructor
//! consumes its values first, each derived constructor continues where its
//! parent stopped. [`Args`] is that shared cursor.
//!
//! # Example
//!
//! ```rust
//! use classlink::args;
//!
//! let mut args = args![3, 1.5, "label"];
//!
//! assert_eq!(args.int().unwrap(), 3);
//! assert_eq!(args.real().unwrap(), 1.5);
//! assert_eq!(args.text().unwrap(), "label");
//! assert_eq!(args.remaining(), 0);
//! ```

use crate::error::{Error, Result};

/// A single constructor argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer
    Int(i64),
    /// Floating point number
    Real(f64),
    /// Boolean flag
    Bool(bool),
    /// Owned text
    Text(String),
}

impl Value {
    /// Name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Ordered argument cursor shared by a constructor chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
    cursor: usize,
}

impl Args {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    #[must_use]
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Number of values supplied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of values consumed so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Number of values not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.cursor)
    }

    /// Takes the next value, whatever its kind.
    ///
    /// Returns `None` once every value was consumed.
    pub fn next_value(&mut self) -> Option<&Value> {
        let value = self.values.get(self.cursor)?;
        self.cursor += 1;
        Some(value)
    }

    /// Looks at the next value without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<&Value> {
        self.values.get(self.cursor)
    }

    fn take_as<T>(
        &mut self,
        expected: &'static str,
        extract: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T> {
        let index = self.cursor;
        let value = self
            .values
            .get(index)
            .ok_or(Error::MissingArgument { index })?;
        let found = value.kind();
        let out = extract(value).ok_or(Error::ArgumentMismatch {
            index,
            expected,
            found,
        })?;
        self.cursor += 1;
        Ok(out)
    }

    /// Takes the next value as an integer.
    ///
    /// # Errors
    ///
    /// [`Error::MissingArgument`] if none is left, [`Error::ArgumentMismatch`]
    /// if it is not [`Value::Int`]. The cursor does not move on error.
    pub fn int(&mut self) -> Result<i64> {
        self.take_as("int", |value| match value {
            Value::Int(value) => Some(*value),
            _ => None,
        })
    }

    /// Takes the next value as a real number.
    ///
    /// # Errors
    ///
    /// See [`Args::int`].
    pub fn real(&mut self) -> Result<f64> {
        self.take_as("real", |value| match value {
            Value::Real(value) => Some(*value),
            _ => None,
        })
    }

    /// Takes the next value as a boolean.
    ///
    /// # Errors
    ///
    /// See [`Args::int`].
    pub fn bool(&mut self) -> Result<bool> {
        self.take_as("bool", |value| match value {
            Value::Bool(value) => Some(*value),
            _ => None,
        })
    }

    /// Takes the next value as text.
    ///
    /// # Errors
    ///
    /// See [`Args::int`].
    pub fn text(&mut self) -> Result<&str> {
        let index = self.cursor;
        match self.values.get(index) {
            Some(Value::Text(value)) => {
                self.cursor += 1;
                Ok(value.as_str())
            }
            Some(other) => Err(Error::ArgumentMismatch {
                index,
                expected: "text",
                found: other.kind(),
            }),
            None => Err(Error::MissingArgument { index }),
        }
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Args { values, cursor: 0 }
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Args::from(iter.into_iter().collect::<Vec<_>>())
    }
}

/// Builds an [`Args`] list from heterogeneous values.
///
/// ```rust
/// use classlink::args;
///
/// let args = args![2, true];
/// assert_eq!(args.len(), 2);
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::runtime::Args::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::runtime::Args::from(vec![$($crate::runtime::Value::from($value)),+])
    };
}
