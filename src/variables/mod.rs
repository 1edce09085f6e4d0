//! Monitored variables and the registry that discovers them.
//!
//! A [`Variable`] is the readable unit handed to consumers: a named view of one monitored field
//! or zero-argument method, either static or bound to one live instance. Variables are created by
//! the [`VariableRegistry`] and shared as [`VariableRc`].
//!
//! # Key Components
//!
//! - [`Variable`] / [`VariableRc`] - Bound, readable monitored values
//! - [`VariableKind`] - Whether a variable reads a field or invokes a method
//! - [`FieldHandle`] / [`MethodHandle`] - Resolved members waiting to be bound
//! - [`VariableRegistry`] - Discovery, binding and snapshots
//!
//! # Reading
//!
//! [`Variable::read`] never fails and never panics. A dropped instance, an accessor error and an
//! accessor panic are all reported as [`Reading::Failed`], so one broken member cannot disturb the
//! report of all others.

mod handle;
mod registry;
mod store;

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use strum::Display;

pub use handle::{FieldHandle, MethodHandle, Rejection};
pub use registry::{VariableRegistry, VariableRegistryBuilder};

use crate::runtime::{
    FieldRc, InstanceRc, InstanceRef, Member, MethodRc, ReadError, Reading, TypeRc, ValueType,
};

/// A reference-counted `Variable`
pub type VariableRc = Arc<Variable>;

/// What a variable reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum VariableKind {
    /// The value of a field
    Field,
    /// The return value of a zero-argument method
    Method,
}

/// The member behind a variable
#[derive(Clone)]
pub(crate) enum Target {
    Field(FieldRc),
    Method(MethodRc),
}

/// A named, readable monitored value
pub struct Variable {
    /// The type declaring the member
    owner: TypeRc,
    /// Display name, fixed when the variable is created
    name: String,
    /// The member read by this variable
    target: Target,
    /// The instance this variable is bound to; `None` for static members
    instance: Option<InstanceRef>,
}

impl Variable {
    pub(crate) fn new(
        owner: TypeRc,
        name: String,
        target: Target,
        instance: Option<InstanceRef>,
    ) -> Self {
        Variable {
            owner,
            name,
            target,
            instance,
        }
    }

    /// The type that declares the monitored member
    pub fn owner(&self) -> &TypeRc {
        &self.owner
    }

    /// The display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field type or method return type
    pub fn value_type(&self) -> &ValueType {
        match &self.target {
            Target::Field(field) => &field.value_type,
            Target::Method(method) => &method.return_type,
        }
    }

    /// Whether this variable reads a field or invokes a method
    pub fn kind(&self) -> VariableKind {
        match &self.target {
            Target::Field(_) => VariableKind::Field,
            Target::Method(_) => VariableKind::Method,
        }
    }

    /// The monitored member
    pub fn member(&self) -> Member<'_> {
        match &self.target {
            Target::Field(field) => Member::Field(field),
            Target::Method(method) => Member::Method(method),
        }
    }

    /// Returns `true` if the variable is not bound to an instance
    pub fn is_static(&self) -> bool {
        self.instance.is_none()
    }

    /// The instance this variable is bound to.
    ///
    /// Returns `None` for static variables and once the instance has been dropped.
    pub fn instance(&self) -> Option<InstanceRc> {
        self.instance.as_ref().and_then(InstanceRef::upgrade)
    }

    /// Returns `false` once the bound instance has been dropped; static variables are always live
    pub fn is_live(&self) -> bool {
        self.instance.as_ref().map_or(true, InstanceRef::is_valid)
    }

    /// Read the current value.
    ///
    /// The instance is upgraded for the duration of the read only. Failures of any kind, including
    /// a panicking accessor, are returned as [`Reading::Failed`].
    pub fn read(&self) -> Reading {
        let receiver = match &self.instance {
            Some(instance) => match instance.upgrade() {
                Some(strong) => Some(strong),
                None => return Reading::Failed(ReadError::InstanceDropped),
            },
            None => None,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let view = receiver
                .as_ref()
                .map(|instance| instance.view_as(&self.owner.name));

            match &self.target {
                Target::Field(field) => field.read(view),
                Target::Method(method) => method.invoke(view),
            }
        }));

        match outcome {
            Ok(result) => Reading::from(result),
            Err(payload) => Reading::Failed(ReadError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

/// Extract the message of a panic payload
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("owner", &self.owner.name)
            .field("kind", &self.kind())
            .field("instance", &self.instance)
            .finish()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.read())
    }
}
