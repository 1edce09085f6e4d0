//! Scanner over a declaration index.
//!
//! [`ManifestScanner`] is the stock [`AnnotationScanner`]. It is fed [`TypeDeclaration`]s, the
//! name-and-marker summary of a type a build step would emit, and answers queries from an index
//! partitioned by marker.
//!
//! The index is rebuilt lazily: registering a new interest marker or declaring another type only
//! flags the scanner, and the next query performs the rescan. Queries in between are served from
//! the cached index without locking out other readers; queries that arrive during a rescan wait
//! for it.
//!
//! # Examples
//!
//! ```rust
//! use varscope::scanner::{AnnotationScanner, ManifestScanner, MethodEntry, TypeDeclaration};
//!
//! let scanner = ManifestScanner::with_packages(["app."]);
//! scanner.declare(TypeDeclaration::new("app.Queue").method("get_depth", &["Monitored"]));
//! scanner.declare(TypeDeclaration::new("vendor.Queue").method("get_depth", &["Monitored"]));
//! scanner.add_interest_marker("Monitored");
//!
//! assert_eq!(
//!     scanner.methods_marked_with("Monitored")?,
//!     [MethodEntry::new("app.Queue", "get_depth")]
//! );
//! # Ok::<(), varscope::Error>(())
//! ```

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};

use dashmap::DashSet;

use crate::{
    runtime::TypeDef,
    scanner::{AnnotationScanner, ClassEntry, FieldEntry, MethodEntry},
    Result,
};

/// A declared member and the names of the markers attached to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDeclaration {
    /// Member name
    pub name: String,
    /// Attached marker names
    pub markers: Vec<String>,
}

impl MemberDeclaration {
    /// Create a member declaration
    pub fn new(name: impl Into<String>, markers: &[&str]) -> Self {
        MemberDeclaration {
            name: name.into(),
            markers: markers.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns `true` if the marker is attached
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }
}

/// Name-only summary of a type: its markers and the markers of its declared members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    /// Fully qualified type name
    pub type_name: String,
    /// Markers attached to the type
    pub markers: Vec<String>,
    /// Declared fields, in declaration order
    pub fields: Vec<MemberDeclaration>,
    /// Declared methods, in declaration order
    pub methods: Vec<MemberDeclaration>,
}

impl TypeDeclaration {
    /// Start a declaration for the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        TypeDeclaration {
            type_name: type_name.into(),
            markers: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Attach a type-level marker
    #[must_use]
    pub fn marked(mut self, marker: &str) -> Self {
        self.markers.push(marker.to_string());
        self
    }

    /// Declare a field with its markers
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, markers: &[&str]) -> Self {
        self.fields.push(MemberDeclaration::new(name, markers));
        self
    }

    /// Declare a method with its markers
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, markers: &[&str]) -> Self {
        self.methods.push(MemberDeclaration::new(name, markers));
        self
    }
}

impl From<&TypeDef> for TypeDeclaration {
    fn from(type_def: &TypeDef) -> Self {
        let names = |markers: &[crate::runtime::Marker]| -> Vec<String> {
            markers.iter().map(|marker| marker.name.clone()).collect()
        };

        TypeDeclaration {
            type_name: type_def.name.clone(),
            markers: names(&type_def.markers),
            fields: type_def
                .fields
                .iter()
                .map(|field| MemberDeclaration {
                    name: field.name.clone(),
                    markers: names(&field.markers),
                })
                .collect(),
            methods: type_def
                .methods
                .iter()
                .map(|method| MemberDeclaration {
                    name: method.name.clone(),
                    markers: names(&method.markers),
                })
                .collect(),
        }
    }
}

/// Scan results partitioned by marker name
#[derive(Default)]
struct ScanIndex {
    classes: HashMap<String, Vec<ClassEntry>>,
    methods: HashMap<String, Vec<MethodEntry>>,
    fields: HashMap<String, Vec<FieldEntry>>,
}

/// An [`AnnotationScanner`] over declared [`TypeDeclaration`]s, optionally restricted to a set of
/// package prefixes.
pub struct ManifestScanner {
    /// Type name prefixes in scope; empty means every declaration is in scope
    packages: Vec<String>,
    /// All declarations, in declaration order
    declarations: boxcar::Vec<TypeDeclaration>,
    /// Registered interest markers
    markers: DashSet<String>,
    /// Set whenever the cached index is stale
    needs_scan: AtomicBool,
    /// The cached index, write-locked for the whole of a rebuild
    index: RwLock<ScanIndex>,
}

impl Default for ManifestScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestScanner {
    /// Create a scanner covering every declaration
    #[must_use]
    pub fn new() -> Self {
        Self::with_packages(Vec::<String>::new())
    }

    /// Create a scanner that only reports types whose names start with one of `packages`
    pub fn with_packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ManifestScanner {
            packages: packages.into_iter().map(Into::into).collect(),
            declarations: boxcar::Vec::new(),
            markers: DashSet::new(),
            needs_scan: AtomicBool::new(false),
            index: RwLock::new(ScanIndex::default()),
        }
    }

    /// Add a declaration to the index. Returns its position in declaration order.
    pub fn declare(&self, declaration: TypeDeclaration) -> usize {
        let position = self.declarations.push(declaration);
        self.needs_scan.store(true, Ordering::Release);
        position
    }

    /// Add the declaration summarising an existing type definition
    pub fn declare_type(&self, type_def: &TypeDef) -> usize {
        self.declare(TypeDeclaration::from(type_def))
    }

    /// Returns the number of declarations, in scope or not
    pub fn declaration_count(&self) -> usize {
        self.declarations.count()
    }

    fn in_scope(&self, type_name: &str) -> bool {
        self.packages.is_empty()
            || self
                .packages
                .iter()
                .any(|package| type_name.starts_with(package.as_str()))
    }

    /// Rebuild the index if it is stale.
    ///
    /// The index stays write-locked from clearing the stale flag until the rebuilt index is in
    /// place, so a reader that finds the flag cleared blocks on the index until the rebuild is
    /// done. A marker registered while the rebuild runs flags the scanner again. A failed rebuild
    /// leaves the scanner stale.
    fn check_scan(&self) -> Result<()> {
        if !self.needs_scan.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut index = write_lock!(self.index);
        if !self.needs_scan.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        match self.scan() {
            Ok(rebuilt) => {
                *index = rebuilt;
                Ok(())
            }
            Err(error) => {
                self.needs_scan.store(true, Ordering::Release);
                Err(error)
            }
        }
    }

    fn scan(&self) -> Result<ScanIndex> {
        let markers: Vec<String> = self.markers.iter().map(|m| m.key().clone()).collect();
        let mut index = ScanIndex::default();

        for (position, declaration) in self.declarations.iter() {
            if declaration.type_name.trim().is_empty() {
                return Err(scan_error!(
                    "Declaration #{} has an empty type name",
                    position
                ));
            }

            if !self.in_scope(&declaration.type_name) {
                continue;
            }

            for member in declaration.fields.iter().chain(declaration.methods.iter()) {
                if member.name.trim().is_empty() {
                    return Err(scan_error!(
                        "Type '{}' declares a member with an empty name",
                        declaration.type_name
                    ));
                }
            }

            for marker in &markers {
                if declaration.markers.iter().any(|m| m == marker) {
                    index
                        .classes
                        .entry(marker.clone())
                        .or_default()
                        .push(ClassEntry::new(declaration.type_name.clone()));
                }

                for method in declaration.methods.iter().filter(|m| m.has_marker(marker)) {
                    index
                        .methods
                        .entry(marker.clone())
                        .or_default()
                        .push(MethodEntry::new(
                            declaration.type_name.clone(),
                            method.name.clone(),
                        ));
                }

                for field in declaration.fields.iter().filter(|f| f.has_marker(marker)) {
                    index
                        .fields
                        .entry(marker.clone())
                        .or_default()
                        .push(FieldEntry::new(
                            declaration.type_name.clone(),
                            field.name.clone(),
                        ));
                }
            }
        }

        Ok(index)
    }
}

impl AnnotationScanner for ManifestScanner {
    fn add_interest_marker(&self, marker: &str) {
        if self.markers.insert(marker.to_string()) {
            self.needs_scan.store(true, Ordering::Release);
        }
    }

    fn classes_marked_with(&self, marker: &str) -> Result<Vec<ClassEntry>> {
        self.check_scan()?;
        Ok(read_lock!(self.index)
            .classes
            .get(marker)
            .cloned()
            .unwrap_or_default())
    }

    fn methods_marked_with(&self, marker: &str) -> Result<Vec<MethodEntry>> {
        self.check_scan()?;
        Ok(read_lock!(self.index)
            .methods
            .get(marker)
            .cloned()
            .unwrap_or_default())
    }

    fn fields_marked_with(&self, marker: &str) -> Result<Vec<FieldEntry>> {
        self.check_scan()?;
        Ok(read_lock!(self.index)
            .fields
            .get(marker)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        runtime::{FieldDef, Marker, MethodDef, TypeBuilder, ValueType},
        Error,
    };

    fn fixture() -> ManifestScanner {
        let scanner = ManifestScanner::new();
        scanner.declare(
            TypeDeclaration::new("t.TestClass")
                .marked("Foo")
                .field("public_foo", &["Foo"])
                .field("public_bar", &[])
                .field("static_foo", &["Foo", "Bar"])
                .method("get_foo", &["Foo"])
                .method("get_bar", &["Bar"]),
        );
        scanner.declare(TypeDeclaration::new("t.Plain").field("value", &[]));
        scanner
    }

    #[test]
    fn test_unregistered_marker_is_empty() {
        let scanner = fixture();
        assert!(scanner.fields_marked_with("Foo").unwrap().is_empty());
        assert!(scanner.classes_marked_with("Foo").unwrap().is_empty());
    }

    #[test]
    fn test_marked_members_in_declaration_order() {
        let scanner = fixture();
        scanner.add_interest_marker("Foo");

        assert_eq!(
            scanner.classes_marked_with("Foo").unwrap(),
            [ClassEntry::new("t.TestClass")]
        );
        assert_eq!(
            scanner.fields_marked_with("Foo").unwrap(),
            [
                FieldEntry::new("t.TestClass", "public_foo"),
                FieldEntry::new("t.TestClass", "static_foo")
            ]
        );
        assert_eq!(
            scanner.methods_marked_with("Foo").unwrap(),
            [MethodEntry::new("t.TestClass", "get_foo")]
        );
    }

    #[test]
    fn test_lazy_rescan_on_new_marker() {
        let scanner = fixture();
        scanner.add_interest_marker("Foo");
        assert!(scanner.methods_marked_with("Bar").unwrap().is_empty());

        scanner.add_interest_marker("Bar");
        assert_eq!(
            scanner.methods_marked_with("Bar").unwrap(),
            [MethodEntry::new("t.TestClass", "get_bar")]
        );
        assert_eq!(scanner.fields_marked_with("Foo").unwrap().len(), 2);
    }

    #[test]
    fn test_rescan_on_new_declaration() {
        let scanner = fixture();
        scanner.add_interest_marker("Foo");
        assert_eq!(scanner.fields_marked_with("Foo").unwrap().len(), 2);

        scanner.declare(TypeDeclaration::new("t.Late").field("late", &["Foo"]));
        assert_eq!(scanner.fields_marked_with("Foo").unwrap().len(), 3);
        assert_eq!(scanner.declaration_count(), 3);
    }

    #[test]
    fn test_package_scope() {
        let scanner = ManifestScanner::with_packages(["app."]);
        scanner.declare(TypeDeclaration::new("app.Kept").field("a", &["Foo"]));
        scanner.declare(TypeDeclaration::new("lib.Skipped").field("b", &["Foo"]));
        scanner.add_interest_marker("Foo");

        assert_eq!(
            scanner.fields_marked_with("Foo").unwrap(),
            [FieldEntry::new("app.Kept", "a")]
        );
    }

    #[test]
    fn test_malformed_declaration_stays_stale() {
        let scanner = ManifestScanner::new();
        scanner.declare(TypeDeclaration::new("t.Broken").field("", &["Foo"]));
        scanner.add_interest_marker("Foo");

        assert!(matches!(
            scanner.fields_marked_with("Foo"),
            Err(Error::Scan { .. })
        ));
        assert!(matches!(
            scanner.methods_marked_with("Foo"),
            Err(Error::Scan { .. })
        ));
    }

    #[test]
    fn test_registered_marker_visible_during_concurrent_rescans() {
        use rayon::prelude::*;

        for _ in 0..20 {
            let scanner = ManifestScanner::new();
            for n in 0..400 {
                let marker = format!("M{}", n % 16);
                scanner.declare(
                    TypeDeclaration::new(format!("t.Type{n}")).field("value", &[marker.as_str()]),
                );
            }

            (0..16).into_par_iter().for_each(|m| {
                let marker = format!("M{m}");
                scanner.add_interest_marker(&marker);
                assert_eq!(scanner.fields_marked_with(&marker).unwrap().len(), 25);
            });
        }
    }

    #[test]
    fn test_declare_type() {
        let ty = TypeBuilder::new("t.Built")
            .marked(Marker::new("Foo"))
            .field(FieldDef::new_static("hits", ValueType::I64, || 1_i64).marked(Marker::new("Foo")))
            .method(MethodDef::new_static("get_rate", ValueType::F64, || 0.5))
            .build()
            .unwrap();

        let scanner = ManifestScanner::new();
        scanner.declare_type(&ty);
        scanner.add_interest_marker("Foo");

        assert_eq!(scanner.classes_marked_with("Foo").unwrap().len(), 1);
        assert_eq!(
            scanner.fields_marked_with("Foo").unwrap(),
            [FieldEntry::new("t.Built", "hits")]
        );
        assert!(scanner.methods_marked_with("Foo").unwrap().is_empty());
    }
}
