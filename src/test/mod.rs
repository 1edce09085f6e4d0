//! Shared test fixtures.
//!
//! [`ScriptedScanner`] reports a fixed list of entries and can be told to fail, and
//! [`ToggleDetector`] knows a set of types whose loaded state the test switches explicitly.


use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use dashmap::{DashMap, DashSet};

use crate::{
    detector::ClassDetector,
    runtime::TypeRc,
    scanner::{AnnotationScanner, ClassEntry, FieldEntry, MethodEntry},
    Result,
};

/// Scanner reporting a fixed set of entries for every marker
#[derive(Default)]
pub struct ScriptedScanner {
    classes: Vec<ClassEntry>,
    methods: Vec<MethodEntry>,
    fields: Vec<FieldEntry>,
    failures_left: AtomicUsize,
    markers: Mutex<Vec<String>>,
    queries: AtomicUsize,
}

impl ScriptedScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, type_name: &str) -> Self {
        self.classes.push(ClassEntry::new(type_name));
        self
    }

    pub fn method(mut self, type_name: &str, method_name: &str) -> Self {
        self.methods.push(MethodEntry::new(type_name, method_name));
        self
    }

    pub fn field(mut self, type_name: &str, field_name: &str) -> Self {
        self.fields.push(FieldEntry::new(type_name, field_name));
        self
    }

    /// Fail the next `count` queries
    pub fn failing(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// The interest markers registered so far
    pub fn markers(&self) -> Vec<String> {
        lock!(self.markers).clone()
    }

    /// Number of entry queries answered or failed
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(&self, entries: &[T]) -> Result<Vec<T>> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(scan_error!("scripted failure"));
        }

        Ok(entries.to_vec())
    }
}

impl AnnotationScanner for ScriptedScanner {
    fn add_interest_marker(&self, marker: &str) {
        lock!(self.markers).push(marker.to_string());
    }

    fn classes_marked_with(&self, _marker: &str) -> Result<Vec<ClassEntry>> {
        self.answer(&self.classes)
    }

    fn methods_marked_with(&self, _marker: &str) -> Result<Vec<MethodEntry>> {
        self.answer(&self.methods)
    }

    fn fields_marked_with(&self, _marker: &str) -> Result<Vec<FieldEntry>> {
        self.answer(&self.fields)
    }
}

/// Detector over known types whose loaded state is switched by the test
#[derive(Default)]
pub struct ToggleDetector {
    types: DashMap<String, TypeRc>,
    loaded: DashSet<String>,
    lookups: AtomicUsize,
}

impl ToggleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a type known, initially not loaded
    pub fn add(&self, type_def: TypeRc) {
        self.types.insert(type_def.name.clone(), type_def);
    }

    pub fn set_loaded(&self, type_name: &str, loaded: bool) {
        if loaded {
            self.loaded.insert(type_name.to_string());
        } else {
            self.loaded.remove(type_name);
        }
    }

    /// Number of `loaded_type` calls
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ClassDetector for ToggleDetector {
    fn is_type_loaded(&self, type_name: &str) -> bool {
        self.loaded.contains(type_name)
    }

    fn loaded_type(&self, type_name: &str) -> Option<TypeRc> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.loaded.contains(type_name) {
            return None;
        }
        self.types.get(type_name).map(|entry| entry.value().clone())
    }
}
