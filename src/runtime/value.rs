//! Values, value types and read outcomes.
//!
//! Monitored members are read through accessor closures that produce a [`Value`]. The registry
//! never lets a failed read escape as an error or a panic: every read yields a [`Reading`], which is
//! either the value or the captured [`ReadError`].
//!
//! # Key Components
//!
//! - [`ValueType`] - The static type of a field or the return type of a method
//! - [`Value`] - A dynamically typed snapshot of a monitored value
//! - [`ReadError`] - Why a read could not produce a value
//! - [`Reading`] - Tagged union of a successful value or a captured failure
//!
//! # Examples
//!
//! ```rust
//! use varscope::runtime::{Reading, ReadError, Value, ValueType};
//!
//! let ok = Reading::from(Ok::<_, ReadError>(Value::from(42_i64)));
//! assert_eq!(ok.value(), Some(&Value::Int(42)));
//!
//! let failed = Reading::Failed(ReadError::InstanceDropped);
//! assert!(failed.is_failed());
//!
//! assert_eq!("i64".parse::<ValueType>().unwrap(), ValueType::I64);
//! assert_eq!(
//!     "app.Session".parse::<ValueType>().unwrap(),
//!     ValueType::Object("app.Session".to_string())
//! );
//! ```

use std::fmt;

use strum::EnumString;
use thiserror::Error;

/// The static type of a monitored member.
///
/// For fields this is the declared field type, for methods the return type. [`ValueType::Void`]
/// only ever appears as a method return type; such methods are never bound to variables.
///
/// Parsing from a string accepts the lower-case primitive names; any other name is captured as
/// [`ValueType::Object`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
pub enum ValueType {
    /// No value, only valid as a method return type
    #[strum(serialize = "void")]
    Void,
    /// Boolean
    #[strum(serialize = "bool")]
    Bool,
    /// Signed 32-bit integer
    #[strum(serialize = "i32")]
    I32,
    /// Signed 64-bit integer
    #[strum(serialize = "i64")]
    I64,
    /// Unsigned 64-bit integer
    #[strum(serialize = "u64")]
    U64,
    /// 64-bit floating point
    #[strum(serialize = "f64")]
    F64,
    /// UTF-8 string
    #[strum(serialize = "string")]
    String,
    /// Any other type, identified by name
    #[strum(default)]
    Object(String),
}

impl ValueType {
    /// Returns `true` for [`ValueType::Void`].
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, ValueType::Void)
    }

    /// Returns the name of this type as it would be written in a declaration.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ValueType::Void => "void",
            ValueType::Bool => "bool",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::U64 => "u64",
            ValueType::F64 => "f64",
            ValueType::String => "string",
            ValueType::Object(name) => name,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A snapshot of a monitored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i64),
    /// Unsigned integer value
    UInt(u64),
    /// Floating point value
    Float(f64),
    /// String value
    Str(String),
    /// Opaque value, rendered through its textual representation
    Object(String),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as a signed integer, if it is one and fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Wrap any displayable value as an opaque [`Value::Object`].
    pub fn object(value: impl fmt::Display) -> Self {
        Value::Object(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) | Value::Object(v) => f.write_str(v),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $target:ty, $($source:ty),+) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

value_from!(Int, i64, i8, i16, i32, i64);
value_from!(UInt, u64, u8, u16, u32, u64);
value_from!(Float, f64, f32, f64);
value_from!(Bool, bool, bool);
value_from!(Str, String, String, &str);

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::UInt(value as u64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Reasons a monitored member could not be read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    /// The instance a variable was bound to has been dropped.
    #[error("The bound instance has been dropped")]
    InstanceDropped,

    /// The member refused access.
    #[error("Access denied - {0}")]
    AccessDenied(String),

    /// The accessor reported a failure.
    #[error("Accessor failed - {0}")]
    Accessor(String),

    /// The accessor panicked; the panic message is captured.
    #[error("Accessor panicked - {0}")]
    Panicked(String),

    /// A non-static member was read without a receiver.
    #[error("Member '{0}' requires an instance")]
    MissingReceiver(String),

    /// The receiver is not of the type the accessor was declared for.
    #[error("Expected receiver of type '{expected}', found '{found}'")]
    TypeMismatch {
        /// The type the accessor downcasts to
        expected: &'static str,
        /// Debug rendering of the receiver's `TypeId`, since `Any` carries no type name
        found: String,
    },
}

/// The outcome of reading a variable.
///
/// A failed read is ordinary data: consumers render it next to successful values instead of
/// aborting the whole report.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// The current value
    Value(Value),
    /// The captured failure
    Failed(ReadError),
}

impl Reading {
    /// Returns `true` if the read failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Reading::Failed(_))
    }

    /// The value, if the read succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Reading::Value(value) => Some(value),
            Reading::Failed(_) => None,
        }
    }

    /// The failure, if the read failed.
    #[must_use]
    pub fn failure(&self) -> Option<&ReadError> {
        match self {
            Reading::Value(_) => None,
            Reading::Failed(error) => Some(error),
        }
    }

    /// Convert into a standard `Result`.
    ///
    /// # Errors
    /// Returns the captured [`ReadError`] if the read failed.
    pub fn into_result(self) -> std::result::Result<Value, ReadError> {
        match self {
            Reading::Value(value) => Ok(value),
            Reading::Failed(error) => Err(error),
        }
    }
}

impl From<std::result::Result<Value, ReadError>> for Reading {
    fn from(result: std::result::Result<Value, ReadError>) -> Self {
        match result {
            Ok(value) => Reading::Value(value),
            Err(error) => Reading::Failed(error),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(value) => write!(f, "{value}"),
            Reading::Failed(error) => write!(f, "<{error}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_parse() {
        assert_eq!("void".parse::<ValueType>().unwrap(), ValueType::Void);
        assert_eq!("bool".parse::<ValueType>().unwrap(), ValueType::Bool);
        assert_eq!("u64".parse::<ValueType>().unwrap(), ValueType::U64);
        assert_eq!(
            "std::time::Duration".parse::<ValueType>().unwrap(),
            ValueType::Object("std::time::Duration".to_string())
        );
    }

    #[test]
    fn test_value_type_display() {
        assert_eq!(ValueType::I32.to_string(), "i32");
        assert_eq!(ValueType::Object("app.Pool".into()).to_string(), "app.Pool");
        assert!(ValueType::Void.is_void());
        assert!(!ValueType::String.is_void());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(7_i32), Value::Int(7));
        assert_eq!(Value::from(7_u16), Value::UInt(7));
        assert_eq!(Value::from(3_usize), Value::UInt(3));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("idle"), Value::Str("idle".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(1.5_f64)), Value::Float(1.5));

        assert_eq!(Value::UInt(9).as_i64(), Some(9));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Str("x".into()).as_str(), Some("x"));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::object(std::net::Ipv4Addr::LOCALHOST).to_string(), "127.0.0.1");
    }

    #[test]
    fn test_reading() {
        let reading = Reading::from(Ok::<_, ReadError>(Value::Int(1)));
        assert!(!reading.is_failed());
        assert_eq!(reading.failure(), None);
        assert_eq!(reading.clone().into_result(), Ok(Value::Int(1)));

        let reading = Reading::from(Err(ReadError::AccessDenied("sealed".into())));
        assert!(reading.is_failed());
        assert_eq!(reading.value(), None);
        assert_eq!(reading.to_string(), "<Access denied - sealed>");
    }
}
