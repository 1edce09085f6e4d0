//! Weakly keyed storage of instance-bound variables.
//!
//! Slots are keyed by the allocation address of the instance. Each slot keeps a weak reference
//! next to the variables, and that weak reference keeps the allocation reserved even after the
//! instance is dropped, so an address cannot be handed to a new instance while its slot exists.
//! Dead slots are hidden from snapshots and removed by [`InstanceStore::sweep`].
//!
//! A slot also records which monitored declarations it has bound. Registering an instance again
//! under [`DuplicatePolicy::Ignore`] adds only declarations that were not bound yet, such as those
//! of an ancestor type that loaded after the first registration.

use std::collections::HashSet;

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    config::DuplicatePolicy,
    runtime::{identity_of, InstanceRc, InstanceRef},
    variables::{VariableKind, VariableRc},
};

/// Identifies a monitored declaration: the type declaring the marked member, its name and kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Binding {
    type_name: String,
    member: String,
    kind: VariableKind,
}

impl Binding {
    pub(crate) fn new(type_name: &str, member: &str, kind: VariableKind) -> Self {
        Binding {
            type_name: type_name.to_string(),
            member: member.to_string(),
            kind,
        }
    }
}

/// The variables bound to one instance
struct InstanceSlot {
    instance: InstanceRef,
    bound: HashSet<Binding>,
    variables: Vec<VariableRc>,
}

impl InstanceSlot {
    fn new(instance: &InstanceRc, bindings: Vec<(Binding, VariableRc)>) -> Self {
        let mut slot = InstanceSlot {
            instance: InstanceRef::new(instance),
            bound: HashSet::new(),
            variables: Vec::with_capacity(bindings.len()),
        };
        for (binding, variable) in bindings {
            slot.bound.insert(binding);
            slot.variables.push(variable);
        }
        slot
    }
}

/// Outcome of publishing a set of variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Publication {
    /// First registration of the instance
    Inserted,
    /// Added to the variables of a live registration
    Appended,
    /// The instance was already registered with every offered binding
    Ignored,
}

/// Instance-bound variables keyed by instance identity
#[derive(Default)]
pub(crate) struct InstanceStore {
    slots: DashMap<usize, InstanceSlot>,
}

impl InstanceStore {
    pub(crate) fn new() -> Self {
        InstanceStore {
            slots: DashMap::new(),
        }
    }

    /// Publish the variables bound to `instance` in one step.
    ///
    /// A live slot for the same instance keeps its variables. Under [`DuplicatePolicy::Ignore`]
    /// only bindings it does not hold yet are added; under [`DuplicatePolicy::Append`] all are.
    pub(crate) fn publish(
        &self,
        instance: &InstanceRc,
        bindings: Vec<(Binding, VariableRc)>,
        policy: DuplicatePolicy,
    ) -> Publication {
        match self.slots.entry(identity_of(instance)) {
            Entry::Occupied(mut occupied) if occupied.get().instance.refers_to(instance) => {
                let slot = occupied.get_mut();
                let before = slot.variables.len();

                for (binding, variable) in bindings {
                    let fresh = slot.bound.insert(binding);
                    if fresh || policy == DuplicatePolicy::Append {
                        slot.variables.push(variable);
                    }
                }

                if slot.variables.len() > before {
                    Publication::Appended
                } else {
                    Publication::Ignored
                }
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(InstanceSlot::new(instance, bindings));
                Publication::Inserted
            }
            Entry::Vacant(vacant) => {
                vacant.insert(InstanceSlot::new(instance, bindings));
                Publication::Inserted
            }
        }
    }

    /// Append the variables of all live instances to `out`
    pub(crate) fn collect_live(&self, out: &mut Vec<VariableRc>) {
        for slot in self.slots.iter() {
            if slot.instance.is_valid() {
                out.extend(slot.variables.iter().cloned());
            }
        }
    }

    /// Remove the slots of dropped instances, returning how many were removed
    pub(crate) fn sweep(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.instance.is_valid());
        before.saturating_sub(self.slots.len())
    }

    /// Number of registered instances that are still alive
    pub(crate) fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.instance.is_valid())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        runtime::{FieldDef, TypeBuilder, ValueType},
        variables::FieldHandle,
    };

    struct Node;
    crate::instance!(Node, "s.Node");

    fn bound(member: &str, instance: &InstanceRc) -> (Binding, VariableRc) {
        (
            Binding::new("s.Node", member, VariableKind::Field),
            variable(instance),
        )
    }

    fn variable(instance: &InstanceRc) -> VariableRc {
        let ty = TypeBuilder::new("s.Node")
            .field(
                FieldDef::new_instance::<Node, _, _>("id", ValueType::I32, |_| 1)
                    .marked(crate::runtime::Marker::new("Monitored")),
            )
            .build()
            .unwrap();
        let handle = FieldHandle::resolve(&ty, "id", "Monitored").unwrap();
        Arc::new(handle.bind("id".to_string(), Some(InstanceRef::new(instance))))
    }

    #[test]
    fn test_publish_policies() {
        let store = InstanceStore::new();
        let node: InstanceRc = Arc::new(Node);

        assert_eq!(store.live_count(), 0);
        assert_eq!(
            store.publish(&node, vec![bound("id", &node)], DuplicatePolicy::Ignore),
            Publication::Inserted
        );
        assert_eq!(store.live_count(), 1);
        assert_eq!(
            store.publish(&node, vec![bound("id", &node)], DuplicatePolicy::Ignore),
            Publication::Ignored
        );

        let mut out = Vec::new();
        store.collect_live(&mut out);
        assert_eq!(out.len(), 1);

        assert_eq!(
            store.publish(&node, vec![bound("id", &node)], DuplicatePolicy::Append),
            Publication::Appended
        );
        out.clear();
        store.collect_live(&mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_ignore_adds_only_missing_bindings() {
        let store = InstanceStore::new();
        let node: InstanceRc = Arc::new(Node);

        store.publish(&node, vec![bound("id", &node)], DuplicatePolicy::Ignore);
        assert_eq!(
            store.publish(
                &node,
                vec![bound("id", &node), bound("parent", &node)],
                DuplicatePolicy::Ignore
            ),
            Publication::Appended
        );
        assert_eq!(
            store.publish(
                &node,
                vec![bound("id", &node), bound("parent", &node)],
                DuplicatePolicy::Ignore
            ),
            Publication::Ignored
        );

        let mut out = Vec::new();
        store.collect_live(&mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_dead_slots_hidden_then_swept() {
        let store = InstanceStore::new();
        let kept: InstanceRc = Arc::new(Node);
        let dropped: InstanceRc = Arc::new(Node);

        store.publish(&kept, vec![bound("id", &kept)], DuplicatePolicy::Ignore);
        store.publish(&dropped, vec![bound("id", &dropped)], DuplicatePolicy::Ignore);
        assert_eq!(store.live_count(), 2);

        drop(dropped);
        assert_eq!(store.live_count(), 1);

        let mut out = Vec::new();
        store.collect_live(&mut out);
        assert_eq!(out.len(), 1);

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.live_count(), 1);
    }
}
