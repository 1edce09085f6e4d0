//! Display names for monitored members.
//!
//! A [`NamingStrategy`] turns a member and the interest marker found on it into the name a variable
//! is published under. Strategies are pure functions; the registry calls them exactly once per
//! variable, when the variable is created.
//!
//! Any `Fn(Member<'_>, Option<&Marker>) -> String` closure is a strategy:
//!
//! ```rust
//! use varscope::{naming::NamingStrategy, runtime::{FieldDef, Marker, Member, ValueType}};
//!
//! let upper = |member: Member<'_>, _: Option<&Marker>| member.name().to_uppercase();
//!
//! let field = FieldDef::new_static("hits", ValueType::I64, || 1_i64);
//! assert_eq!(upper.name(Member::Field(&field), None), "HITS");
//! ```

use crate::runtime::{Marker, Member};

/// Derives the display name of a variable
pub trait NamingStrategy: Send + Sync {
    /// The display name for `member`, given the interest marker attached to it (if any)
    fn name(&self, member: Member<'_>, marker: Option<&Marker>) -> String;
}

impl<F> NamingStrategy for F
where
    F: Fn(Member<'_>, Option<&Marker>) -> String + Send + Sync,
{
    fn name(&self, member: Member<'_>, marker: Option<&Marker>) -> String {
        self(member, marker)
    }
}

/// The naming strategy used unless a registry is configured otherwise.
///
/// - A non-empty marker payload is used verbatim.
/// - Fields keep their name.
/// - Methods lose a leading `get_`, `get`, `is_` or `is` and the next character is lower-cased, so
///   `get_count`, `getCount` and `count` all name the variable `count`. A name that consists of the
///   prefix alone is kept as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNamingStrategy;

const ACCESSOR_PREFIXES: [&str; 4] = ["get_", "get", "is_", "is"];

impl DefaultNamingStrategy {
    fn method_name(name: &str) -> String {
        let stripped = ACCESSOR_PREFIXES
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix).filter(|rest| !rest.is_empty()));

        match stripped {
            Some(rest) => {
                let mut chars = rest.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => name.to_string(),
                }
            }
            None => name.to_string(),
        }
    }
}

impl NamingStrategy for DefaultNamingStrategy {
    fn name(&self, member: Member<'_>, marker: Option<&Marker>) -> String {
        if let Some(value) = marker.and_then(|m| m.value.as_deref()) {
            if !value.is_empty() {
                return value.to_string();
            }
        }

        match member {
            Member::Field(field) => field.name.clone(),
            Member::Method(method) => Self::method_name(&method.name),
        }
    }
}
