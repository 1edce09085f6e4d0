//! Host type model used in place of runtime reflection.
//!
//! Rust has no runtime reflection, so the types whose members can be monitored are described
//! explicitly: a [`TypeDef`] lists its declared fields and methods, its markers and its base type,
//! and every member carries an accessor closure that performs the read. This is the same
//! information a reflective runtime would report, captured in an explicit metadata table.
//!
//! # Key Components
//!
//! - [`TypeDef`]: A loaded type with its declared members and base type
//! - [`TypeBuilder`]: Fluent construction of [`TypeDef`]s with consistency checks
//! - [`TypeCatalog`]: The table of loaded types; the stock [`crate::detector::ClassDetector`]
//! - [`FieldDef`] / [`MethodDef`]: Declared members with flags, markers and accessors
//! - [`Instance`] / [`InstanceRef`]: Live objects and weak references to them
//! - [`Value`] / [`Reading`]: Read values and failure-as-value outcomes
//!
//! # Inheritance
//!
//! Members are always *declared* on exactly one type. Inherited members are found by walking
//! [`TypeDef::ancestors`], most-derived first, which is also the order in which method overrides
//! shadow the declarations of their parents.
//!
//! # Examples
//!
//! ```rust
//! use varscope::runtime::{FieldDef, MethodDef, TypeBuilder, ValueType};
//!
//! struct Base;
//! struct Derived;
//!
//! let base = TypeBuilder::new("app.Base")
//!     .method(MethodDef::new_instance::<Base, _, _>("level", ValueType::I32, |_| 1))
//!     .build()?;
//! let derived = TypeBuilder::new("app.Derived")
//!     .base(&base)
//!     .field(FieldDef::new_static("created", ValueType::U64, || 3_u64))
//!     .build()?;
//!
//! let chain: Vec<String> = derived.ancestors().map(|t| t.name.clone()).collect();
//! assert_eq!(chain, ["app.Derived", "app.Base"]);
//! assert!(derived.is_subtype_of("app.Base"));
//! # Ok::<(), varscope::Error>(())
//! ```

mod builder;
mod catalog;
mod instance;
mod member;
mod value;

use std::sync::{Arc, OnceLock};

pub use builder::TypeBuilder;
pub use catalog::TypeCatalog;
pub use instance::{identity_of, Instance, InstanceRc, InstanceRef};
pub use member::{
    Accessor, FieldDef, FieldFlags, FieldRc, Marker, Member, MethodDef, MethodFlags, MethodRc,
};
pub use value::{ReadError, Reading, Value, ValueType};

use crate::{Error::TypeError, Result};

/// Reference to a `TypeDef`
pub type TypeRc = Arc<TypeDef>;

/// A loaded type: its name, base type, markers and declared members.
pub struct TypeDef {
    /// Fully qualified type name, the key used by scanners and detectors
    pub name: String,
    /// This types base aka 'extends'
    base: OnceLock<TypeRc>,
    /// Markers attached to the type itself
    pub markers: Vec<Marker>,
    /// Fields declared directly on this type
    pub fields: Vec<FieldRc>,
    /// Methods declared directly on this type
    pub methods: Vec<MethodRc>,
}

impl TypeDef {
    /// Create a new instance of a `TypeDef`
    pub fn new(
        name: String,
        base: Option<TypeRc>,
        markers: Vec<Marker>,
        fields: Vec<FieldRc>,
        methods: Vec<MethodRc>,
    ) -> Self {
        let base_lock = OnceLock::new();
        if let Some(base_value) = base {
            base_lock.set(base_value).ok();
        }

        TypeDef {
            name,
            base: base_lock,
            markers,
            fields,
            methods,
        }
    }

    /// Access the base type of this type, if it exists
    pub fn base(&self) -> Option<TypeRc> {
        self.base.get().cloned()
    }

    /// Link the base type after construction.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeError`] if a base is already set or if linking would make the
    /// type its own ancestor.
    pub fn set_base(&self, base: TypeRc) -> Result<()> {
        if base.ancestors().any(|ancestor| std::ptr::eq(ancestor.as_ref(), self)) {
            return Err(TypeError(format!(
                "'{}' cannot extend '{}': inheritance cycle",
                self.name, base.name
            )));
        }

        self.base
            .set(base)
            .map_err(|_| TypeError(format!("Base of '{}' already set", self.name)))
    }

    /// Iterate over this type and all of its ancestors, most-derived first
    pub fn ancestors(self: &Arc<Self>) -> Ancestors {
        Ancestors {
            next: Some(self.clone()),
        }
    }

    /// Returns `true` if this type or one of its ancestors has the given name
    pub fn is_subtype_of(self: &Arc<Self>, name: &str) -> bool {
        self.ancestors().any(|ancestor| ancestor.name == name)
    }

    /// The field with the given name declared directly on this type
    pub fn declared_field(&self, name: &str) -> Option<&FieldRc> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The method with the given name declared directly on this type
    pub fn declared_method(&self, name: &str) -> Option<&MethodRc> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Returns `true` if a marker with the given name is attached to the type
    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.iter().any(|marker| marker.name == name)
    }
}

impl std::fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("base", &self.base.get().map(|base| base.name.as_str()))
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Iterator over a type and its ancestors, see [`TypeDef::ancestors`]
pub struct Ancestors {
    next: Option<TypeRc>,
}

impl Iterator for Ancestors {
    type Item = TypeRc;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.base();
        Some(current)
    }
}
