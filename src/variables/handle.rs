//! Handles to resolved members.
//!
//! Once the type of a scan entry is loaded, the entry is resolved against the type's declared
//! members. A successful resolution yields a [`FieldHandle`] or [`MethodHandle`]: the live member
//! together with its declaring type, not yet tied to a name or an instance. Handles of static
//! members are turned into variables immediately; handles of instance members wait for instances.

use strum::Display;

use crate::{
    runtime::{FieldRc, InstanceRef, Member, MethodRc, TypeRc},
    variables::{Target, Variable},
};

/// Why a scan entry could not be resolved to a monitorable member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Rejection {
    /// The type declares no member of that name
    #[strum(to_string = "member is not declared on the type")]
    Missing,
    /// The member exists but does not carry the interest marker
    #[strum(to_string = "member does not carry the interest marker")]
    Unmarked,
    /// The member was generated rather than declared
    #[strum(to_string = "member is synthetic")]
    Synthetic,
    /// The method is implemented outside the host runtime
    #[strum(to_string = "method is native")]
    Native,
    /// The method takes parameters
    #[strum(to_string = "method takes parameters")]
    HasParameters,
    /// The method returns nothing
    #[strum(to_string = "method returns void")]
    ReturnsVoid,
}

impl Rejection {
    /// Returns `true` if the scan and the loaded type disagree, rather than the member merely
    /// having an unsupported shape
    #[must_use]
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Rejection::Missing | Rejection::Unmarked)
    }
}

/// A monitored field of a loaded type
#[derive(Debug, Clone)]
pub struct FieldHandle {
    owner: TypeRc,
    field: FieldRc,
}

impl FieldHandle {
    /// Resolve the field `name` declared directly on `owner` and carrying `marker`
    ///
    /// # Errors
    /// Returns the [`Rejection`] if no acceptable field exists.
    pub fn resolve(owner: &TypeRc, name: &str, marker: &str) -> Result<Self, Rejection> {
        let field = owner.declared_field(name).ok_or(Rejection::Missing)?;

        if !field.has_marker(marker) {
            return Err(Rejection::Unmarked);
        }
        if field.is_synthetic() {
            return Err(Rejection::Synthetic);
        }

        Ok(FieldHandle {
            owner: owner.clone(),
            field: field.clone(),
        })
    }

    /// The declaring type
    pub fn owner(&self) -> &TypeRc {
        &self.owner
    }

    /// The field
    pub fn field(&self) -> &FieldRc {
        &self.field
    }

    /// The field as a [`Member`], for naming
    pub fn member(&self) -> Member<'_> {
        Member::Field(&self.field)
    }

    /// Create a variable reading this field, from `instance` or statically
    pub fn bind(&self, name: String, instance: Option<InstanceRef>) -> Variable {
        Variable::new(
            self.owner.clone(),
            name,
            Target::Field(self.field.clone()),
            instance,
        )
    }
}

/// A monitored zero-argument method of a loaded type
#[derive(Debug, Clone)]
pub struct MethodHandle {
    owner: TypeRc,
    method: MethodRc,
}

impl MethodHandle {
    /// Resolve the method `name` declared directly on `owner` and carrying `marker`
    ///
    /// # Errors
    /// Returns the [`Rejection`] if no acceptable method exists.
    pub fn resolve(owner: &TypeRc, name: &str, marker: &str) -> Result<Self, Rejection> {
        let method = owner.declared_method(name).ok_or(Rejection::Missing)?;

        if !method.has_marker(marker) {
            return Err(Rejection::Unmarked);
        }
        if method.is_synthetic() {
            return Err(Rejection::Synthetic);
        }
        if method.is_native() {
            return Err(Rejection::Native);
        }
        if !method.is_accessor_shaped() {
            return Err(if method.parameters.is_empty() {
                Rejection::ReturnsVoid
            } else {
                Rejection::HasParameters
            });
        }

        Ok(MethodHandle {
            owner: owner.clone(),
            method: method.clone(),
        })
    }

    /// The declaring type
    pub fn owner(&self) -> &TypeRc {
        &self.owner
    }

    /// The method
    pub fn method(&self) -> &MethodRc {
        &self.method
    }

    /// The method as a [`Member`], for naming
    pub fn member(&self) -> Member<'_> {
        Member::Method(&self.method)
    }

    /// The declaration a call on an instance of `runtime_type` dispatches to.
    ///
    /// Walks from `runtime_type` towards the declaring type and returns the first declaration of
    /// the same name, marked or not. Declarations that cannot override an accessor (static ones,
    /// or ones taking parameters or returning nothing) are passed over. Returns this handle when
    /// nothing overrides it, or when `runtime_type` does not descend from the declaring type.
    #[must_use]
    pub fn dispatch(&self, runtime_type: &TypeRc) -> MethodHandle {
        if !runtime_type.is_subtype_of(&self.owner.name) {
            return self.clone();
        }

        for current in runtime_type.ancestors() {
            if current.name == self.owner.name {
                break;
            }

            if let Some(method) = current.declared_method(&self.method.name) {
                if !method.is_static() && method.is_accessor_shaped() {
                    return MethodHandle {
                        owner: current.clone(),
                        method: method.clone(),
                    };
                }
            }
        }

        self.clone()
    }

    /// Create a variable invoking this method, on `instance` or statically
    pub fn bind(&self, name: String, instance: Option<InstanceRef>) -> Variable {
        Variable::new(
            self.owner.clone(),
            name,
            Target::Method(self.method.clone()),
            instance,
        )
    }
}
