//! The table of loaded types.
//!
//! [`TypeCatalog`] plays the role of a runtime's loaded-class table. Application code loads a
//! type when it is first initialised; from then on the catalog reports it as loaded. Querying the
//! catalog never loads anything, which makes it a valid [`ClassDetector`].
//!
//! # Thread Safety
//!
//! The catalog is backed by a lock-free `SkipMap`. Loads and lookups can run from any number of
//! threads; a given name is loaded at most once, even when two threads race to load it.
//!
//! # Examples
//!
//! ```rust
//! use varscope::{detector::ClassDetector, runtime::{TypeBuilder, TypeCatalog}};
//!
//! let catalog = TypeCatalog::new();
//! assert!(!catalog.is_type_loaded("app.Service"));
//!
//! catalog.load(TypeBuilder::new("app.Service").build()?)?;
//! assert!(catalog.is_type_loaded("app.Service"));
//! assert_eq!(catalog.loaded_type("app.Service").unwrap().name, "app.Service");
//! # Ok::<(), varscope::Error>(())
//! ```

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;

use crate::{
    detector::ClassDetector,
    runtime::TypeRc,
    Error::{TypeAlreadyLoaded, TypeNotFound},
    Result,
};

/// Concurrent table of loaded types, keyed by type name
#[derive(Default)]
pub struct TypeCatalog {
    /// Loaded types indexed by name
    types: SkipMap<String, TypeRc>,
}

impl TypeCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        TypeCatalog {
            types: SkipMap::new(),
        }
    }

    /// Mark a type as loaded.
    ///
    /// ## Arguments
    /// * 'new_type' - The type to load
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeAlreadyLoaded`] if a different type with the same name has
    /// already been loaded. Loading the very same `TypeRc` twice is accepted.
    pub fn load(&self, new_type: TypeRc) -> Result<TypeRc> {
        let entry = self
            .types
            .get_or_insert(new_type.name.clone(), new_type.clone());

        if Arc::ptr_eq(entry.value(), &new_type) {
            Ok(new_type)
        } else {
            Err(TypeAlreadyLoaded(new_type.name.clone()))
        }
    }

    /// Load a type together with all of its not yet loaded ancestors, base types first
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeAlreadyLoaded`] if a different type with the name of `new_type`
    /// or of one of its ancestors has already been loaded.
    pub fn load_with_ancestors(&self, new_type: &TypeRc) -> Result<()> {
        let chain: Vec<TypeRc> = new_type.ancestors().collect();
        for ancestor in chain.into_iter().rev() {
            self.load(ancestor)?;
        }
        Ok(())
    }

    /// Link two loaded types by name, making `base_name` the base of `type_name`.
    ///
    /// Useful when types are loaded independently and their inheritance is only known later.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if either type is not loaded, and
    /// [`crate::Error::TypeError`] if the type already has a base or the link would form a cycle.
    pub fn resolve_base(&self, type_name: &str, base_name: &str) -> Result<()> {
        let derived = self
            .get(type_name)
            .ok_or_else(|| TypeNotFound(type_name.to_string()))?;
        let base = self
            .get(base_name)
            .ok_or_else(|| TypeNotFound(base_name.to_string()))?;

        derived.set_base(base)
    }

    /// Get a loaded type by name
    pub fn get(&self, name: &str) -> Option<TypeRc> {
        self.types.get(name).map(|entry| entry.value().clone())
    }

    /// Returns `true` if a type with this name is loaded
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns the names of all loaded types, in lexicographic order
    pub fn names(&self) -> Vec<String> {
        self.types.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Returns the number of loaded types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type has been loaded
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ClassDetector for TypeCatalog {
    fn is_type_loaded(&self, type_name: &str) -> bool {
        self.contains(type_name)
    }

    fn loaded_type(&self, type_name: &str) -> Option<TypeRc> {
        self.get(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{runtime::TypeBuilder, Error};

    #[test]
    fn test_load_and_lookup() {
        let catalog = TypeCatalog::new();
        assert!(catalog.is_empty());

        let ty = TypeBuilder::new("c.One").build().unwrap();
        catalog.load(ty.clone()).unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("c.One"));
        assert!(Arc::ptr_eq(&catalog.get("c.One").unwrap(), &ty));
        assert!(catalog.get("c.Two").is_none());
    }

    #[test]
    fn test_reload_same_and_conflicting() {
        let catalog = TypeCatalog::new();
        let ty = TypeBuilder::new("c.One").build().unwrap();

        catalog.load(ty.clone()).unwrap();
        catalog.load(ty).unwrap();

        let other = TypeBuilder::new("c.One").build().unwrap();
        assert!(matches!(catalog.load(other), Err(Error::TypeAlreadyLoaded(name)) if name == "c.One"));
    }

    #[test]
    fn test_load_with_ancestors() {
        let catalog = TypeCatalog::new();
        let base = TypeBuilder::new("c.Base").build().unwrap();
        let derived = TypeBuilder::new("c.Derived").base(&base).build().unwrap();

        catalog.load_with_ancestors(&derived).unwrap();
        assert_eq!(catalog.names(), ["c.Base", "c.Derived"]);
    }

    #[test]
    fn test_resolve_base() {
        let catalog = TypeCatalog::new();
        catalog.load(TypeBuilder::new("c.Base").build().unwrap()).unwrap();
        catalog.load(TypeBuilder::new("c.Derived").build().unwrap()).unwrap();

        assert!(matches!(
            catalog.resolve_base("c.Derived", "c.Nope"),
            Err(Error::TypeNotFound(name)) if name == "c.Nope"
        ));

        catalog.resolve_base("c.Derived", "c.Base").unwrap();
        assert!(catalog.get("c.Derived").unwrap().is_subtype_of("c.Base"));
        assert!(matches!(
            catalog.resolve_base("c.Base", "c.Derived"),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_detector_through_arc() {
        let catalog = Arc::new(TypeCatalog::new());
        catalog
            .load(TypeBuilder::new("c.Shared").build().unwrap())
            .unwrap();

        let detector: Arc<dyn ClassDetector> = catalog.clone();
        assert!(detector.is_type_loaded("c.Shared"));
        assert!(detector.loaded_type("c.Missing").is_none());
    }
}
