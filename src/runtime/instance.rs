//! Live objects that can carry monitored members.
//!
//! An object takes part in monitoring by implementing [`Instance`], which reports the name of its
//! runtime type and exposes itself as [`Any`] so accessors can downcast to the concrete type. The
//! [`crate::instance!`] macro writes the implementation.
//!
//! Inheritance is modelled by composition: a derived object embeds its base part and hands that
//! part out from [`Instance::view_as`], so members declared on the base type read the base part.
//!
//! The registry only ever keeps an [`InstanceRef`], a weak reference, so registering an object
//! never extends its lifetime.

use std::{
    any::Any,
    fmt,
    sync::{Arc, Weak},
};

/// A reference-counted live instance
pub type InstanceRc = Arc<dyn Instance>;

/// An object whose monitored members can be bound to variables.
pub trait Instance: Any + Send + Sync {
    /// The name of this object's runtime type, as known to the `ClassDetector`
    fn type_name(&self) -> &str;

    /// This object as [`Any`], for downcasting in accessors
    fn as_any(&self) -> &dyn Any;

    /// This object as seen by members declared on `type_name`, one of its ancestors.
    ///
    /// Defaults to the object itself.
    fn view_as(&self, type_name: &str) -> &dyn Any {
        let _ = type_name;
        self.as_any()
    }
}

/// A weak reference to an [`Instance`], used by variables bound to it
#[derive(Clone)]
pub struct InstanceRef {
    weak_ref: Weak<dyn Instance>,
}

impl InstanceRef {
    /// Create a new `InstanceRef` from a strong reference
    pub fn new(strong_ref: &InstanceRc) -> Self {
        Self {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the instance, returning None if it has been dropped
    #[must_use]
    pub fn upgrade(&self) -> Option<InstanceRc> {
        self.weak_ref.upgrade()
    }

    /// Check if the referenced instance is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// The identity of the referenced allocation.
    ///
    /// Identities are only meaningful while the instance is alive; an address can be reused once
    /// it has been dropped.
    #[must_use]
    pub fn identity(&self) -> usize {
        self.weak_ref.as_ptr().cast::<()>() as usize
    }

    /// Returns `true` if this reference points at `instance`
    #[must_use]
    pub fn refers_to(&self, instance: &InstanceRc) -> bool {
        self.is_valid() && self.identity() == identity_of(instance)
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(instance) => write!(f, "InstanceRef({}@{:#x})", instance.type_name(), self.identity()),
            None => write!(f, "InstanceRef(<dropped>@{:#x})", self.identity()),
        }
    }
}

/// The identity of a live instance, matching [`InstanceRef::identity`]
#[must_use]
pub fn identity_of(instance: &InstanceRc) -> usize {
    Arc::as_ptr(instance).cast::<()>() as usize
}
