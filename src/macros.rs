#![allow(unused_macros)]

/// Helper macro for locking items
///
/// A poisoned lock is recovered rather than propagated.
///
/// ```rust, ignore
///  let _guard = lock!(self.resolve_lock);
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let data = read_lock!(my_arc_rwlock);
///  println!("{}", data.some_field);
/// ```
macro_rules! read_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut data = write_lock!(my_arc_rwlock);
///  data.some_field = 42;
/// ```
macro_rules! write_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Implement [`crate::runtime::Instance`] for a type.
///
/// The second argument is the runtime type name under which the type is known to the
/// `ClassDetector` (and under which a scanner reports its members). Any further
/// `"base.Type" => field` pairs name the embedded field that stands in for an ancestor type; the
/// lookup is forwarded to that field, so deeper ancestors can be routed through their child.
///
/// ```rust
/// use std::sync::Arc;
/// use varscope::runtime::{Instance, InstanceRc};
///
/// struct Worker {
///     id: u32,
/// }
/// varscope::instance!(Worker, "app.Worker");
///
/// struct Supervisor {
///     worker: Worker,
/// }
/// varscope::instance!(Supervisor, "app.Supervisor", "app.Worker" => worker);
///
/// let supervisor: InstanceRc = Arc::new(Supervisor { worker: Worker { id: 7 } });
/// assert_eq!(supervisor.type_name(), "app.Supervisor");
///
/// let base = supervisor.view_as("app.Worker").downcast_ref::<Worker>().unwrap();
/// assert_eq!(base.id, 7);
/// ```
#[macro_export]
macro_rules! instance {
    ($ty:ty, $name:expr $(, $base:expr => $part:ident)*) => {
        impl $crate::runtime::Instance for $ty {
            fn type_name(&self) -> &str {
                $name
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn view_as(&self, type_name: &str) -> &dyn ::std::any::Any {
                $(
                    if type_name == $base {
                        return $crate::runtime::Instance::view_as(&self.$part, type_name);
                    }
                )*
                let _ = type_name;
                self
            }
        }
    };
}
