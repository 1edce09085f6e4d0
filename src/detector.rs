//! Load detection for monitored types.
//!
//! A [`ClassDetector`] answers whether a named type has been loaded and hands out the live
//! [`TypeRc`] once it has. Detection must never force a type to load: monitoring observes the
//! application, it does not change what the application has initialised.
//!
//! [`crate::runtime::TypeCatalog`] is the stock implementation. Any `Arc` of a detector is a
//! detector as well, so a single catalog can be shared between a registry and the application.

use std::sync::Arc;

use crate::runtime::TypeRc;

/// Reports which types are currently loaded, without causing loads.
pub trait ClassDetector: Send + Sync {
    /// Determine whether or not a type has been loaded
    fn is_type_loaded(&self, type_name: &str) -> bool;

    /// Return the live type for a loaded type name, or `None` if it is not loaded
    fn loaded_type(&self, type_name: &str) -> Option<TypeRc>;
}

impl<T: ClassDetector + ?Sized> ClassDetector for Arc<T> {
    fn is_type_loaded(&self, type_name: &str) -> bool {
        (**self).is_type_loaded(type_name)
    }

    fn loaded_type(&self, type_name: &str) -> Option<TypeRc> {
        (**self).loaded_type(type_name)
    }
}
