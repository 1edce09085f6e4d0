//! Field and method definitions of the host type model.
//!
//! A member definition carries everything a reflective runtime would report about a declared
//! field or zero-argument method: its name, modifier flags, type, the markers (annotations)
//! attached to it and an accessor closure that performs the actual read.
//!
//! Accessors are written against a concrete receiver type and downcast internally, so a member
//! declared for `Pool` can only ever observe a `Pool`:
//!
//! ```rust
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use varscope::runtime::{FieldDef, Marker, MethodDef, Value, ValueType};
//!
//! struct Pool {
//!     size: AtomicI64,
//! }
//!
//! let field = FieldDef::new_instance::<Pool, _, _>("size", ValueType::I64, |pool| {
//!     pool.size.load(Ordering::Relaxed)
//! })
//! .marked(Marker::new("Monitored"));
//!
//! let pool = Pool { size: AtomicI64::new(8) };
//! assert_eq!(field.read(Some(&pool)), Ok(Value::Int(8)));
//! assert!(field.has_marker("Monitored"));
//!
//! let method = MethodDef::new_static("uptime", ValueType::U64, || 12_u64);
//! assert_eq!(method.invoke(None), Ok(Value::UInt(12)));
//! ```

use std::{any::Any, fmt, sync::Arc};

use bitflags::bitflags;

use crate::runtime::{ReadError, Value, ValueType};

/// A reference-counted field definition
pub type FieldRc = Arc<FieldDef>;
/// A reference-counted method definition
pub type MethodRc = Arc<MethodDef>;

/// The closure performing a member read. The receiver is `None` for static members.
pub type Accessor =
    Arc<dyn Fn(Option<&dyn Any>) -> std::result::Result<Value, ReadError> + Send + Sync>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Field modifier flags
    pub struct FieldFlags: u32 {
        /// Field belongs to the type rather than to instances
        const STATIC = 0x0010;
        /// Field was generated rather than declared
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Method modifier flags
    pub struct MethodFlags: u32 {
        /// Method belongs to the type rather than to instances
        const STATIC = 0x0010;
        /// Method is implemented outside the host runtime
        const NATIVE = 0x0100;
        /// Method was generated rather than declared
        const SYNTHETIC = 0x1000;
    }
}

/// A marker (annotation) attached to a type or member, with an optional payload.
///
/// The payload is what a naming strategy consults to derive a custom display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    /// The marker name, e.g. `Monitored`
    pub name: String,
    /// Optional payload carried by the marker
    pub value: Option<String>,
}

impl Marker {
    /// Create a marker without payload
    pub fn new(name: impl Into<String>) -> Self {
        Marker {
            name: name.into(),
            value: None,
        }
    }

    /// Create a marker with a payload
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Marker {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Build an accessor for a receiver of type `T`, reporting a mismatch instead of panicking.
fn receiver_accessor<T, F>(member: String, read: F) -> Accessor
where
    T: Any,
    F: Fn(&T) -> std::result::Result<Value, ReadError> + Send + Sync + 'static,
{
    Arc::new(move |receiver: Option<&dyn Any>| {
        let Some(receiver) = receiver else {
            return Err(ReadError::MissingReceiver(member.clone()));
        };

        match receiver.downcast_ref::<T>() {
            Some(target) => read(target),
            None => Err(ReadError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: format!("{:?}", receiver.type_id()),
            }),
        }
    })
}

/// Build an accessor for a static member; any receiver is ignored.
fn static_accessor<F>(read: F) -> Accessor
where
    F: Fn() -> std::result::Result<Value, ReadError> + Send + Sync + 'static,
{
    Arc::new(move |_: Option<&dyn Any>| read())
}

/// A declared field
pub struct FieldDef {
    /// Field name, unique among the fields of its declaring type
    pub name: String,
    /// Modifier flags
    pub flags: FieldFlags,
    /// Declared type
    pub value_type: ValueType,
    /// Markers attached to this field
    pub markers: Vec<Marker>,
    accessor: Accessor,
}

impl FieldDef {
    /// Create a field from raw parts
    pub fn new(
        name: impl Into<String>,
        flags: FieldFlags,
        value_type: ValueType,
        accessor: Accessor,
    ) -> Self {
        FieldDef {
            name: name.into(),
            flags,
            value_type,
            markers: Vec::new(),
            accessor,
        }
    }

    /// Create a static field whose current value is produced by `read`
    pub fn new_static<V, F>(name: impl Into<String>, value_type: ValueType, read: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self::new(
            name,
            FieldFlags::STATIC,
            value_type,
            static_accessor(move || Ok(read().into())),
        )
    }

    /// Create an instance field of `T` whose current value is produced by `read`
    pub fn new_instance<T, V, F>(name: impl Into<String>, value_type: ValueType, read: F) -> Self
    where
        T: Any,
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        let name = name.into();
        let accessor = receiver_accessor::<T, _>(name.clone(), move |t| Ok(read(t).into()));
        Self::new(name, FieldFlags::empty(), value_type, accessor)
    }

    /// Attach a marker
    #[must_use]
    pub fn marked(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Add modifier flags
    #[must_use]
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Returns `true` if the field is static
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(FieldFlags::STATIC)
    }

    /// Returns `true` if the field is synthetic
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.flags.contains(FieldFlags::SYNTHETIC)
    }

    /// The marker with the given name, if attached
    #[must_use]
    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    /// Returns `true` if a marker with the given name is attached
    #[must_use]
    pub fn has_marker(&self, name: &str) -> bool {
        self.marker(name).is_some()
    }

    /// Read the current value of the field from `receiver`
    ///
    /// # Errors
    /// Returns a [`ReadError`] if the accessor fails or the receiver does not fit.
    pub fn read(&self, receiver: Option<&dyn Any>) -> std::result::Result<Value, ReadError> {
        (self.accessor)(receiver)
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("value_type", &self.value_type)
            .field("markers", &self.markers)
            .finish_non_exhaustive()
    }
}

/// A declared method
///
/// Only zero-argument methods with a non-void return type are ever invoked. Parameter types are
/// recorded so that other methods can be recognised and rejected.
pub struct MethodDef {
    /// Method name, unique among the methods of its declaring type
    pub name: String,
    /// Modifier flags
    pub flags: MethodFlags,
    /// Declared return type
    pub return_type: ValueType,
    /// Declared parameter types
    pub parameters: Vec<ValueType>,
    /// Markers attached to this method
    pub markers: Vec<Marker>,
    accessor: Accessor,
}

impl MethodDef {
    /// Create a method from raw parts
    pub fn new(
        name: impl Into<String>,
        flags: MethodFlags,
        return_type: ValueType,
        accessor: Accessor,
    ) -> Self {
        MethodDef {
            name: name.into(),
            flags,
            return_type,
            parameters: Vec::new(),
            markers: Vec::new(),
            accessor,
        }
    }

    /// Create a static method returning the value produced by `call`
    pub fn new_static<V, F>(name: impl Into<String>, return_type: ValueType, call: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self::try_static(name, return_type, move || Ok(call()))
    }

    /// Create a static method whose body may fail
    pub fn try_static<V, F>(name: impl Into<String>, return_type: ValueType, call: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> std::result::Result<V, ReadError> + Send + Sync + 'static,
    {
        Self::new(
            name,
            MethodFlags::STATIC,
            return_type,
            static_accessor(move || call().map(Into::into)),
        )
    }

    /// Create an instance method of `T` returning the value produced by `call`
    pub fn new_instance<T, V, F>(name: impl Into<String>, return_type: ValueType, call: F) -> Self
    where
        T: Any,
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        Self::try_instance::<T, V, _>(name, return_type, move |t| Ok(call(t)))
    }

    /// Create an instance method of `T` whose body may fail
    pub fn try_instance<T, V, F>(name: impl Into<String>, return_type: ValueType, call: F) -> Self
    where
        T: Any,
        V: Into<Value>,
        F: Fn(&T) -> std::result::Result<V, ReadError> + Send + Sync + 'static,
    {
        let name = name.into();
        let accessor = receiver_accessor::<T, _>(name.clone(), move |t| call(t).map(Into::into));
        Self::new(name, MethodFlags::empty(), return_type, accessor)
    }

    /// Attach a marker
    #[must_use]
    pub fn marked(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Add modifier flags
    #[must_use]
    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Declare parameter types
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<ValueType>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Returns `true` if the method is static
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    /// Returns `true` if the method is native
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.flags.contains(MethodFlags::NATIVE)
    }

    /// Returns `true` if the method is synthetic
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.flags.contains(MethodFlags::SYNTHETIC)
    }

    /// Returns `true` if the method takes no parameters and returns a value
    #[must_use]
    pub fn is_accessor_shaped(&self) -> bool {
        self.parameters.is_empty() && !self.return_type.is_void()
    }

    /// The marker with the given name, if attached
    #[must_use]
    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    /// Returns `true` if a marker with the given name is attached
    #[must_use]
    pub fn has_marker(&self, name: &str) -> bool {
        self.marker(name).is_some()
    }

    /// Invoke the method on `receiver`
    ///
    /// # Errors
    /// Returns a [`ReadError`] if the body fails or the receiver does not fit.
    pub fn invoke(&self, receiver: Option<&dyn Any>) -> std::result::Result<Value, ReadError> {
        (self.accessor)(receiver)
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("return_type", &self.return_type)
            .field("parameters", &self.parameters)
            .field("markers", &self.markers)
            .finish_non_exhaustive()
    }
}

/// A borrowed view of either kind of member, as handed to naming strategies.
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    /// A field
    Field(&'a FieldDef),
    /// A method
    Method(&'a MethodDef),
}

impl<'a> Member<'a> {
    /// The declared member name
    #[must_use]
    pub fn name(&self) -> &'a str {
        match self {
            Member::Field(field) => &field.name,
            Member::Method(method) => &method.name,
        }
    }

    /// Returns `true` for methods
    #[must_use]
    pub fn is_method(&self) -> bool {
        matches!(self, Member::Method(_))
    }

    /// The marker with the given name, if attached
    #[must_use]
    pub fn marker(&self, name: &str) -> Option<&'a Marker> {
        match self {
            Member::Field(field) => field.marker(name),
            Member::Method(method) => method.marker(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct Counter {
        hits: AtomicU32,
    }

    struct Other;

    #[test]
    fn test_instance_field_read() {
        let field = FieldDef::new_instance::<Counter, _, _>("hits", ValueType::I64, |c| {
            c.hits.load(Ordering::Relaxed)
        });
        assert!(!field.is_static());

        let counter = Counter {
            hits: AtomicU32::new(3),
        };
        assert_eq!(field.read(Some(&counter)), Ok(Value::UInt(3)));

        counter.hits.store(5, Ordering::Relaxed);
        assert_eq!(field.read(Some(&counter)), Ok(Value::UInt(5)));
    }

    #[test]
    fn test_instance_field_wrong_receiver() {
        let field = FieldDef::new_instance::<Counter, _, _>("hits", ValueType::I64, |c| {
            c.hits.load(Ordering::Relaxed)
        });

        match field.read(Some(&Other)) {
            Err(ReadError::TypeMismatch { expected, found }) => {
                assert!(expected.ends_with("Counter"));
                assert!(found.starts_with("TypeId"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(
            field.read(None),
            Err(ReadError::MissingReceiver("hits".to_string()))
        );
    }

    #[test]
    fn test_static_members() {
        let field = FieldDef::new_static("limit", ValueType::I32, || 42);
        assert!(field.is_static());
        assert_eq!(field.read(None), Ok(Value::Int(42)));
        assert_eq!(field.read(Some(&Other)), Ok(Value::Int(42)));

        let method = MethodDef::try_static("load", ValueType::F64, || {
            Err::<f64, _>(ReadError::Accessor("sensor offline".into()))
        });
        assert!(method.is_static());
        assert_eq!(
            method.invoke(None),
            Err(ReadError::Accessor("sensor offline".into()))
        );
    }

    #[test]
    fn test_method_shape() {
        let method = MethodDef::new_static("reset", ValueType::Void, || Value::Null);
        assert!(!method.is_accessor_shaped());

        let method = MethodDef::new_static("scaled", ValueType::I64, || 0)
            .with_parameters(vec![ValueType::I64]);
        assert!(!method.is_accessor_shaped());

        let method = MethodDef::new_static("count", ValueType::I64, || 0)
            .with_flags(MethodFlags::NATIVE | MethodFlags::SYNTHETIC);
        assert!(method.is_accessor_shaped());
        assert!(method.is_native());
        assert!(method.is_synthetic());
        assert!(method.is_static());
    }

    #[test]
    fn test_markers() {
        let field = FieldDef::new_static("a", ValueType::I32, || 1)
            .marked(Marker::new("Deprecated"))
            .marked(Marker::with_value("Monitored", "alpha"));

        assert!(field.has_marker("Monitored"));
        assert!(!field.has_marker("Hidden"));
        assert_eq!(
            field.marker("Monitored").and_then(|m| m.value.as_deref()),
            Some("alpha")
        );

        let member = Member::Field(&field);
        assert_eq!(member.name(), "a");
        assert!(!member.is_method());
        assert!(member.marker("Deprecated").is_some());
    }
}
