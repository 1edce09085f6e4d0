//! Builder for type definitions.
//!
//! [`TypeBuilder`] offers a fluent API for describing a type's declared members before it is
//! loaded into a [`crate::runtime::TypeCatalog`]. Member names must be unique per kind within a
//! type, since scan entries identify members by `(type name, member name)` only.
//!
//! # Example
//!
//! ```rust
//! use varscope::runtime::{FieldDef, Marker, MethodDef, TypeBuilder, ValueType};
//!
//! struct Cache;
//!
//! let cache = TypeBuilder::new("app.Cache")
//!     .marked(Marker::new("Component"))
//!     .field(FieldDef::new_static("capacity", ValueType::U64, || 1024_u64)
//!         .marked(Marker::new("Monitored")))
//!     .method(MethodDef::new_instance::<Cache, _, _>("get_hit_rate", ValueType::F64, |_| 0.9)
//!         .marked(Marker::new("Monitored")))
//!     .build()?;
//!
//! assert_eq!(cache.fields.len(), 1);
//! assert_eq!(cache.methods.len(), 1);
//! # Ok::<(), varscope::Error>(())
//! ```

use std::{collections::HashSet, sync::Arc};

use crate::{
    runtime::{FieldDef, Marker, MethodDef, TypeDef, TypeRc},
    Error::{DuplicateMember, TypeError},
    Result,
};

/// Provides a fluent API for building type definitions
pub struct TypeBuilder {
    /// Name of the type being built
    name: String,
    /// Base type, if any
    base: Option<TypeRc>,
    /// Type-level markers
    markers: Vec<Marker>,
    /// Declared fields, in declaration order
    fields: Vec<FieldDef>,
    /// Declared methods, in declaration order
    methods: Vec<MethodDef>,
}

impl TypeBuilder {
    /// Start building a type with the given fully qualified name
    ///
    /// ## Arguments
    /// * 'name' - The type name
    pub fn new(name: impl Into<String>) -> Self {
        TypeBuilder {
            name: name.into(),
            base: None,
            markers: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Set the base type
    ///
    /// ## Arguments
    /// * 'base' - The type this type extends
    #[must_use]
    pub fn base(mut self, base: &TypeRc) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Attach a type-level marker
    #[must_use]
    pub fn marked(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Declare a field
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a method
    #[must_use]
    pub fn method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Finish the type.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeError`] for an empty type name and
    /// [`crate::Error::DuplicateMember`] if a field or method name is declared twice.
    pub fn build(self) -> Result<TypeRc> {
        if self.name.trim().is_empty() {
            return Err(TypeError("Type name must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(DuplicateMember {
                    type_name: self.name.clone(),
                    member: field.name.clone(),
                });
            }
        }

        seen.clear();
        for method in &self.methods {
            if !seen.insert(method.name.as_str()) {
                return Err(DuplicateMember {
                    type_name: self.name.clone(),
                    member: method.name.clone(),
                });
            }
        }

        Ok(Arc::new(TypeDef::new(
            self.name,
            self.base,
            self.markers,
            self.fields.into_iter().map(Arc::new).collect(),
            self.methods.into_iter().map(Arc::new).collect(),
        )))
    }
}
