//! The variable registry.
//!
//! [`VariableRegistry`] reconciles what the [`AnnotationScanner`] discovered, what the
//! [`ClassDetector`] reports as loaded and which instances callers have registered, and turns the
//! result into [`Variable`]s.
//!
//! # Lifecycle of a scan entry
//!
//! ```text
//! unresolved ──(type loaded)──┬──> static variable
//!                             └──> unbound handle ──(instance registered)──> bound variable
//! ```
//!
//! Every entry is resolved at most once, and only after its type has been observed as loaded;
//! the registry never causes a type to load. Entries of types that never load stay unresolved.
//! Bound variables are created once per registered instance.
//!
//! # Concurrency
//!
//! All operations take `&self` and can run from any thread. The one-time scan and the resolution
//! of each newly loaded type run under a short critical section; instance registrations only
//! synchronize on the concurrent maps they touch and publish all variables of one registration at
//! once, so a snapshot sees either none or all of them.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::{atomic::{AtomicU64, Ordering}, Arc};
//! use varscope::{
//!     runtime::{FieldDef, InstanceRc, Marker, MethodDef, TypeBuilder, TypeCatalog, ValueType},
//!     scanner::ManifestScanner,
//!     VariableRegistry,
//! };
//!
//! struct Pool {
//!     active: AtomicU64,
//! }
//! varscope::instance!(Pool, "app.Pool");
//!
//! let pool_type = TypeBuilder::new("app.Pool")
//!     .field(FieldDef::new_static("created", ValueType::U64, || 2_u64).marked(Marker::new("Monitored")))
//!     .method(
//!         MethodDef::new_instance::<Pool, _, _>("get_active", ValueType::U64, |p| {
//!             p.active.load(Ordering::Relaxed)
//!         })
//!         .marked(Marker::new("Monitored")),
//!     )
//!     .build()?;
//!
//! let scanner = ManifestScanner::new();
//! scanner.declare_type(&pool_type);
//! let catalog = Arc::new(TypeCatalog::new());
//!
//! let registry = VariableRegistry::new(scanner, catalog.clone());
//! assert!(registry.get_variables().is_empty());
//!
//! catalog.load(pool_type)?;
//! let pool: InstanceRc = Arc::new(Pool { active: AtomicU64::new(5) });
//! registry.register_instance(&pool);
//!
//! let names: Vec<String> = registry.get_variables().iter().map(|v| v.to_string()).collect();
//! assert_eq!(names, ["created = 2", "active = 5"]);
//! # Ok::<(), varscope::Error>(())
//! ```

use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::{
    config::{DuplicatePolicy, RegistryConfig},
    detector::ClassDetector,
    naming::{DefaultNamingStrategy, NamingStrategy},
    runtime::{InstanceRc, InstanceRef, Member, TypeRc},
    scanner::{AnnotationScanner, FieldEntry, MethodEntry},
    variables::{
        handle::{FieldHandle, MethodHandle, Rejection},
        store::{Binding, InstanceStore, Publication},
        Variable, VariableKind, VariableRc,
    },
    Error::MissingComponent,
    Result,
};

/// Discovers monitored members and binds them to variables.
pub struct VariableRegistry {
    config: RegistryConfig,
    scanner: Box<dyn AnnotationScanner>,
    detector: Box<dyn ClassDetector>,
    naming: Box<dyn NamingStrategy>,

    /// Set once the scanner results have been partitioned into the unresolved maps
    scanned: AtomicBool,
    /// Guards the one-time scan and each resolution batch
    resolve_lock: Mutex<()>,

    /// Field entries whose type has not been observed as loaded, by type name
    unresolved_fields: DashMap<String, Vec<FieldEntry>>,
    /// Method entries whose type has not been observed as loaded, by type name
    unresolved_methods: DashMap<String, Vec<MethodEntry>>,
    /// Instance field handles waiting for instances, by declaring type name
    unbound_fields: DashMap<String, Vec<FieldHandle>>,
    /// Instance method handles waiting for instances, by declaring type name
    unbound_methods: DashMap<String, Vec<MethodHandle>>,

    /// Variables of static members; only ever grows
    static_variables: boxcar::Vec<VariableRc>,
    /// Variables bound to registered instances
    instances: InstanceStore,
}

impl VariableRegistry {
    /// Create a registry with the default configuration and naming strategy
    ///
    /// ## Arguments
    /// * 'scanner'  - Discovers the marked members
    /// * 'detector' - Reports which types are loaded
    pub fn new(
        scanner: impl AnnotationScanner + 'static,
        detector: impl ClassDetector + 'static,
    ) -> Self {
        Self::from_parts(
            RegistryConfig::default(),
            Box::new(scanner),
            Box::new(detector),
            Box::new(DefaultNamingStrategy),
        )
    }

    /// Start building a registry with a custom configuration or naming strategy
    pub fn builder() -> VariableRegistryBuilder {
        VariableRegistryBuilder::default()
    }

    fn from_parts(
        config: RegistryConfig,
        scanner: Box<dyn AnnotationScanner>,
        detector: Box<dyn ClassDetector>,
        naming: Box<dyn NamingStrategy>,
    ) -> Self {
        scanner.add_interest_marker(&config.marker);

        VariableRegistry {
            config,
            scanner,
            detector,
            naming,
            scanned: AtomicBool::new(false),
            resolve_lock: Mutex::new(()),
            unresolved_fields: DashMap::new(),
            unresolved_methods: DashMap::new(),
            unbound_fields: DashMap::new(),
            unbound_methods: DashMap::new(),
            static_variables: boxcar::Vec::new(),
            instances: InstanceStore::new(),
        }
    }

    /// Return all currently known variables.
    ///
    /// Runs the one-time scan if necessary and resolves the entries of every type that has loaded
    /// since the last call. The result lists all static variables followed by the variables of all
    /// live registered instances. Its order is not meaningful beyond that.
    pub fn get_variables(&self) -> Vec<VariableRc> {
        self.ensure_scanned();
        self.resolve_loaded_types();

        if self.config.sweep_dropped_instances {
            self.purge_dropped_instances();
        }

        let mut variables: Vec<VariableRc> = self
            .static_variables
            .iter()
            .map(|(_, variable)| variable.clone())
            .collect();
        self.instances.collect_live(&mut variables);
        variables
    }

    /// Register an instance whose monitored members should become variables.
    ///
    /// The instance's runtime type and all of its ancestors are searched for unbound member
    /// handles. A monitored method is bound once and always invokes the most-derived
    /// declaration of that name, marked or not. The registry keeps only a weak reference, so
    /// registering never extends the lifetime of the instance.
    ///
    /// Passing `None` does nothing. Registering an instance that is already registered follows
    /// the configured [`DuplicatePolicy`]; with [`DuplicatePolicy::Ignore`] it still binds
    /// members that became available since the previous registration, e.g. those of an ancestor
    /// type that loaded later.
    pub fn register_instance<'a>(&self, instance: impl Into<Option<&'a InstanceRc>>) {
        let Some(instance) = instance.into() else {
            return;
        };

        self.ensure_scanned();
        self.resolve_loaded_types();

        let Some(runtime_type) = self.detector.loaded_type(instance.type_name()) else {
            debug!(
                type_name = instance.type_name(),
                "type of registered instance is not loaded, nothing to bind"
            );
            return;
        };

        let bindings = self.bind_instance(&runtime_type, &InstanceRef::new(instance));
        if bindings.is_empty() {
            trace!(type_name = %runtime_type.name, "instance has no monitored members");
            return;
        }

        let count = bindings.len();
        match self
            .instances
            .publish(instance, bindings, self.config.duplicate_policy)
        {
            Publication::Inserted => {
                debug!(type_name = %runtime_type.name, variables = count, "instance registered");
            }
            Publication::Appended => {
                debug!(type_name = %runtime_type.name, "instance registration extended");
            }
            Publication::Ignored => {
                trace!(type_name = %runtime_type.name, "instance already registered");
            }
        }
    }

    /// The variables of static members resolved so far, without triggering a scan
    pub fn static_variables(&self) -> Vec<VariableRc> {
        self.static_variables
            .iter()
            .map(|(_, variable)| variable.clone())
            .collect()
    }

    /// Names of the types whose scan entries are still waiting for the type to load, sorted
    pub fn unresolved_type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .unresolved_fields
            .iter()
            .map(|entry| entry.key().clone())
            .chain(
                self.unresolved_methods
                    .iter()
                    .map(|entry| entry.key().clone()),
            )
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }

    /// Number of registered instances that are still alive
    pub fn instance_count(&self) -> usize {
        self.instances.live_count()
    }

    /// Remove the variables of dropped instances, returning the number of instances removed
    pub fn purge_dropped_instances(&self) -> usize {
        let removed = self.instances.sweep();
        if removed > 0 {
            debug!(removed, "dropped instances purged");
        }
        removed
    }

    /// The interest marker this registry monitors
    pub fn marker(&self) -> &str {
        &self.config.marker
    }

    /// The configuration this registry was created with
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns `true` once the scanner results have been taken over
    pub fn is_scanned(&self) -> bool {
        self.scanned.load(Ordering::Acquire)
    }

    /// Take over the scanner results, once.
    ///
    /// A failing scanner leaves the registry unscanned, so the next operation tries again.
    fn ensure_scanned(&self) {
        if self.scanned.load(Ordering::Acquire) {
            return;
        }

        let _guard = lock!(self.resolve_lock);
        if self.scanned.load(Ordering::Acquire) {
            return;
        }

        let marker = self.config.marker.as_str();
        let entries = self.scanner.methods_marked_with(marker).and_then(|methods| {
            let fields = self.scanner.fields_marked_with(marker)?;
            Ok((methods, fields))
        });

        let (methods, fields) = match entries {
            Ok(entries) => entries,
            Err(error) => {
                warn!(marker, %error, "annotation scan failed, retrying on next access");
                return;
            }
        };

        debug!(
            marker,
            methods = methods.len(),
            fields = fields.len(),
            "annotation scan complete"
        );

        for entry in methods {
            let mut pending = self
                .unresolved_methods
                .entry(entry.type_name.clone())
                .or_default();
            if !pending.contains(&entry) {
                pending.push(entry);
            }
        }

        for entry in fields {
            let mut pending = self
                .unresolved_fields
                .entry(entry.type_name.clone())
                .or_default();
            if !pending.contains(&entry) {
                pending.push(entry);
            }
        }

        self.scanned.store(true, Ordering::Release);
    }

    /// Resolve the entries of every unresolved type that is loaded by now.
    ///
    /// Each type is resolved in its own batch under `resolve_lock`, and its entries are removed
    /// from the unresolved maps inside that batch, so no entry is resolved twice. The final
    /// acquisition waits for a batch another caller may still be running, which keeps a
    /// registration from missing handles that are about to be published.
    fn resolve_loaded_types(&self) {
        let mut type_names: HashSet<String> = self
            .unresolved_fields
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        type_names.extend(
            self.unresolved_methods
                .iter()
                .map(|entry| entry.key().clone()),
        );

        for type_name in type_names {
            if !self.detector.is_type_loaded(&type_name) {
                continue;
            }

            let _guard = lock!(self.resolve_lock);
            let Some(loaded) = self.detector.loaded_type(&type_name) else {
                warn!(%type_name, "type reported as loaded but not available");
                continue;
            };

            let fields = self.unresolved_fields.remove(&type_name).map(|(_, e)| e);
            let methods = self.unresolved_methods.remove(&type_name).map(|(_, e)| e);
            if fields.is_none() && methods.is_none() {
                continue;
            }

            debug!(%type_name, "type loaded, resolving monitored members");
            self.resolve_fields(&loaded, fields.unwrap_or_default());
            self.resolve_methods(&loaded, methods.unwrap_or_default());
        }

        drop(lock!(self.resolve_lock));
    }

    fn resolve_fields(&self, loaded: &TypeRc, entries: Vec<FieldEntry>) {
        for entry in entries {
            match FieldHandle::resolve(loaded, &entry.field_name, &self.config.marker) {
                Ok(handle) if handle.field().is_static() => {
                    let name = self.variable_name(handle.member());
                    self.static_variables.push(Arc::new(handle.bind(name, None)));
                }
                Ok(handle) => {
                    self.unbound_fields
                        .entry(loaded.name.clone())
                        .or_default()
                        .push(handle);
                }
                Err(rejection) => report_rejection(&entry.to_string(), rejection),
            }
        }
    }

    fn resolve_methods(&self, loaded: &TypeRc, entries: Vec<MethodEntry>) {
        for entry in entries {
            match MethodHandle::resolve(loaded, &entry.method_name, &self.config.marker) {
                Ok(handle) if handle.method().is_static() => {
                    let name = self.variable_name(handle.member());
                    self.static_variables.push(Arc::new(handle.bind(name, None)));
                }
                Ok(handle) => {
                    self.unbound_methods
                        .entry(loaded.name.clone())
                        .or_default()
                        .push(handle);
                }
                Err(rejection) => report_rejection(&entry.to_string(), rejection),
            }
        }
    }

    /// Bind every unbound handle of `runtime_type` and its ancestors to `instance`.
    ///
    /// Method handles are named after the marked declaration but invoke the declaration the
    /// instance dispatches to.
    fn bind_instance(
        &self,
        runtime_type: &TypeRc,
        instance: &InstanceRef,
    ) -> Vec<(Binding, VariableRc)> {
        let mut seen_methods: HashSet<String> = HashSet::new();
        let mut bindings = Vec::new();

        for current in runtime_type.ancestors() {
            if let Some(handles) = self.unbound_fields.get(&current.name) {
                for handle in handles.iter() {
                    let name = self.variable_name(handle.member());
                    bindings.push((
                        Binding::new(&handle.owner().name, &handle.field().name, VariableKind::Field),
                        Arc::new(handle.bind(name, Some(instance.clone()))),
                    ));
                }
            }

            if let Some(handles) = self.unbound_methods.get(&current.name) {
                for handle in handles.iter() {
                    if !seen_methods.insert(handle.method().name.clone()) {
                        continue;
                    }
                    let name = self.variable_name(handle.member());
                    let target = handle.dispatch(runtime_type);
                    bindings.push((
                        Binding::new(
                            &handle.owner().name,
                            &handle.method().name,
                            VariableKind::Method,
                        ),
                        Arc::new(target.bind(name, Some(instance.clone()))),
                    ));
                }
            }
        }

        bindings
    }

    fn variable_name(&self, member: Member<'_>) -> String {
        self.naming.name(member, member.marker(&self.config.marker))
    }
}

fn report_rejection(entry: &str, rejection: Rejection) {
    if rejection.is_inconsistency() {
        warn!(%entry, %rejection, "scan entry dropped");
    } else {
        debug!(%entry, %rejection, "scan entry dropped");
    }
}

impl fmt::Debug for VariableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableRegistry")
            .field("config", &self.config)
            .field("scanned", &self.is_scanned())
            .field("unresolved_types", &self.unresolved_type_names())
            .field("static_variables", &self.static_variables.count())
            .field("instances", &self.instance_count())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`VariableRegistry`]
///
/// The scanner and the detector are required; the naming strategy defaults to
/// [`DefaultNamingStrategy`] and the configuration to [`RegistryConfig::default`].
#[derive(Default)]
pub struct VariableRegistryBuilder {
    config: RegistryConfig,
    scanner: Option<Box<dyn AnnotationScanner>>,
    detector: Option<Box<dyn ClassDetector>>,
    naming: Option<Box<dyn NamingStrategy>>,
}

impl VariableRegistryBuilder {
    /// Set the annotation scanner
    #[must_use]
    pub fn scanner(mut self, scanner: impl AnnotationScanner + 'static) -> Self {
        self.scanner = Some(Box::new(scanner));
        self
    }

    /// Set the class detector
    #[must_use]
    pub fn detector(mut self, detector: impl ClassDetector + 'static) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    /// Set the naming strategy
    #[must_use]
    pub fn naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Some(Box::new(naming));
        self
    }

    /// Replace the whole configuration
    #[must_use]
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the interest marker
    #[must_use]
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.config.marker = marker.into();
        self
    }

    /// Set the duplicate registration policy
    #[must_use]
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    /// Create the registry
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingComponent`] if the scanner or detector is missing and
    /// [`crate::Error::InvalidConfig`] if the configuration does not validate.
    pub fn build(self) -> Result<VariableRegistry> {
        self.config.validate()?;

        let scanner = self.scanner.ok_or(MissingComponent("scanner"))?;
        let detector = self.detector.ok_or(MissingComponent("detector"))?;
        let naming = self
            .naming
            .unwrap_or_else(|| Box::new(DefaultNamingStrategy));

        Ok(VariableRegistry::from_parts(
            self.config,
            scanner,
            detector,
            naming,
        ))
    }
}
