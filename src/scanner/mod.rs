//! Discovery of marked symbols.
//!
//! An [`AnnotationScanner`] reports, for an interest marker, which types, methods and fields carry
//! that marker. It only reports names: nothing here requires the owning types to be loaded, which
//! is what allows a registry to learn about symbols long before their types become available.
//!
//! # Key Components
//!
//! - [`AnnotationScanner`] - The discovery contract consumed by the registry
//! - [`ClassEntry`], [`MethodEntry`], [`FieldEntry`] - Declarative, name-only scan results
//! - [`ManifestScanner`] - Scanner over a build-time declaration index
//!
//! # Examples
//!
//! ```rust
//! use varscope::scanner::{AnnotationScanner, FieldEntry, ManifestScanner, TypeDeclaration};
//!
//! let scanner = ManifestScanner::new();
//! scanner.declare(TypeDeclaration::new("app.Pool").field("size", &["Monitored"]));
//! scanner.add_interest_marker("Monitored");
//!
//! assert_eq!(
//!     scanner.fields_marked_with("Monitored")?,
//!     [FieldEntry::new("app.Pool", "size")]
//! );
//! # Ok::<(), varscope::Error>(())
//! ```

mod manifest;

use std::{fmt, sync::Arc};

pub use manifest::{ManifestScanner, MemberDeclaration, TypeDeclaration};

use crate::Result;

/// A type carrying an interest marker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassEntry {
    /// Fully qualified type name
    pub type_name: String,
}

impl ClassEntry {
    /// Create a new class entry
    pub fn new(type_name: impl Into<String>) -> Self {
        ClassEntry {
            type_name: type_name.into(),
        }
    }
}

/// A method carrying an interest marker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodEntry {
    /// Name of the declaring type
    pub type_name: String,
    /// Name of the method
    pub method_name: String,
}

impl MethodEntry {
    /// Create a new method entry
    pub fn new(type_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        MethodEntry {
            type_name: type_name.into(),
            method_name: method_name.into(),
        }
    }
}

/// A field carrying an interest marker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldEntry {
    /// Name of the declaring type
    pub type_name: String,
    /// Name of the field
    pub field_name: String,
}

impl FieldEntry {
    /// Create a new field entry
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        FieldEntry {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }
}

impl fmt::Display for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

impl fmt::Display for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}()", self.type_name, self.method_name)
    }
}

impl fmt::Display for FieldEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.type_name, self.field_name)
    }
}

/// Discovers symbols that carry a given marker.
///
/// Implementations must be safe to call repeatedly and from multiple threads. They may cache their
/// results, but a marker registered through [`AnnotationScanner::add_interest_marker`] must be
/// reflected by the next query for it. Queries for a marker that was never registered return
/// empty lists.
pub trait AnnotationScanner: Send + Sync {
    /// Register a marker whose symbols should be discovered
    fn add_interest_marker(&self, marker: &str);

    /// Types carrying `marker`, in discovery order
    ///
    /// # Errors
    /// Returns [`crate::Error::Scan`] if the underlying index cannot be scanned.
    fn classes_marked_with(&self, marker: &str) -> Result<Vec<ClassEntry>>;

    /// Methods carrying `marker`, in discovery order
    ///
    /// # Errors
    /// Returns [`crate::Error::Scan`] if the underlying index cannot be scanned.
    fn methods_marked_with(&self, marker: &str) -> Result<Vec<MethodEntry>>;

    /// Fields carrying `marker`, in discovery order
    ///
    /// # Errors
    /// Returns [`crate::Error::Scan`] if the underlying index cannot be scanned.
    fn fields_marked_with(&self, marker: &str) -> Result<Vec<FieldEntry>>;
}

impl<T: AnnotationScanner + ?Sized> AnnotationScanner for Arc<T> {
    fn add_interest_marker(&self, marker: &str) {
        (**self).add_interest_marker(marker);
    }

    fn classes_marked_with(&self, marker: &str) -> Result<Vec<ClassEntry>> {
        (**self).classes_marked_with(marker)
    }

    fn methods_marked_with(&self, marker: &str) -> Result<Vec<MethodEntry>> {
        (**self).methods_marked_with(marker)
    }

    fn fields_marked_with(&self, marker: &str) -> Result<Vec<FieldEntry>> {
        (**self).fields_marked_with(marker)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_entry_equality() {
        let mut set = HashSet::new();
        assert!(set.insert(MethodEntry::new("a.T", "count")));
        assert!(!set.insert(MethodEntry::new("a.T", "count")));
        assert!(set.insert(MethodEntry::new("a.T", "size")));
        assert!(set.insert(MethodEntry::new("a.U", "count")));
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(ClassEntry::new("a.T").to_string(), "a.T");
        assert_eq!(MethodEntry::new("a.T", "count").to_string(), "a.T::count()");
        assert_eq!(FieldEntry::new("a.T", "size").to_string(), "a.T::size");
    }
}
