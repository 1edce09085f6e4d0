//! Concurrent use of a single registry.
//!
//! Registrations, snapshots and type loads race against each other from a rayon pool; the
//! assertions check the states every interleaving has to end up in.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rayon::prelude::*;
use varscope::{prelude::*, Result};

struct Worker {
    id: u64,
    processed: AtomicU64,
}
varscope::instance!(Worker, "pool.Worker");

fn worker_type() -> Result<TypeRc> {
    TypeBuilder::new("pool.Worker")
        .field(
            FieldDef::new_static("pool_size", ValueType::U64, || 64_u64)
                .marked(Marker::new("Monitored")),
        )
        .field(
            FieldDef::new_instance::<Worker, _, _>("processed", ValueType::U64, |w| {
                w.processed.load(Ordering::Relaxed)
            })
            .marked(Marker::new("Monitored")),
        )
        .method(
            MethodDef::new_instance::<Worker, _, _>("get_id", ValueType::U64, |w| w.id)
                .marked(Marker::new("Monitored")),
        )
        .build()
}

fn registry() -> Result<(VariableRegistry, Arc<TypeCatalog>, TypeRc)> {
    let worker = worker_type()?;
    let scanner = ManifestScanner::new();
    scanner.declare_type(&worker);

    let catalog = Arc::new(TypeCatalog::new());
    Ok((VariableRegistry::new(scanner, catalog.clone()), catalog, worker))
}

fn workers(count: u64) -> Vec<InstanceRc> {
    (0..count)
        .map(|id| -> InstanceRc {
            Arc::new(Worker {
                id,
                processed: AtomicU64::new(id * 10),
            })
        })
        .collect()
}

#[test]
fn test_parallel_registration() -> Result<()> {
    let (registry, catalog, worker) = registry()?;
    catalog.load(worker)?;

    let instances = workers(256);
    instances
        .par_iter()
        .for_each(|instance| registry.register_instance(instance));

    let variables = registry.get_variables();
    assert_eq!(variables.len(), 1 + 2 * instances.len());
    assert_eq!(registry.instance_count(), instances.len());
    assert_eq!(
        variables.iter().filter(|v| v.is_static()).count(),
        1,
        "static variables must not be duplicated"
    );

    let mut ids: Vec<u64> = variables
        .iter()
        .filter(|v| v.name() == "id")
        .filter_map(|v| v.read().value().and_then(Value::as_i64))
        .map(|id| id as u64)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..256).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_racing_duplicate_registrations() -> Result<()> {
    let (registry, catalog, worker) = registry()?;
    catalog.load(worker)?;

    let instances = workers(8);
    (0..512).into_par_iter().for_each(|n| {
        registry.register_instance(&instances[n % instances.len()]);
    });

    // Exactly one binding set per instance, however the registrations interleaved
    assert_eq!(registry.get_variables().len(), 1 + 2 * instances.len());
    assert_eq!(registry.instance_count(), instances.len());
    Ok(())
}

#[test]
fn test_snapshots_during_load_and_registration() -> Result<()> {
    let (registry, catalog, worker) = registry()?;
    let instances = workers(64);

    rayon::scope(|scope| {
        scope.spawn(|_| {
            // Loading the type races against everything else
            catalog.load(worker).ok();
        });

        scope.spawn(|_| {
            for _ in 0..200 {
                let snapshot = registry.get_variables();
                assert!(snapshot.iter().filter(|v| v.is_static()).count() <= 1);
                assert!(snapshot.iter().all(|v| !v.read().is_failed()));
            }
        });

        scope.spawn(|_| {
            instances
                .par_iter()
                .for_each(|instance| registry.register_instance(instance));
        });
    });

    // Registrations that ran before the load bound nothing; register again now that it is loaded
    assert!(catalog.is_type_loaded("pool.Worker"));
    instances
        .par_iter()
        .for_each(|instance| registry.register_instance(instance));

    let variables = registry.get_variables();
    assert_eq!(variables.iter().filter(|v| v.is_static()).count(), 1);
    assert_eq!(variables.len(), 1 + 2 * instances.len());
    Ok(())
}

#[test]
fn test_registries_sharing_a_scanner() -> Result<()> {
    let worker = worker_type()?;
    let catalog = Arc::new(TypeCatalog::new());
    catalog.load(worker.clone())?;

    for _ in 0..50 {
        let scanner = Arc::new(ManifestScanner::new());
        for n in 0..2000 {
            scanner.declare(TypeDeclaration::new(format!("pool.Filler{n}")).field("x", &["Other"]));
        }
        scanner.declare_type(&worker);

        let first = VariableRegistry::new(scanner.clone(), catalog.clone());
        let second = VariableRegistry::new(scanner.clone(), catalog.clone());

        let (a, b) = rayon::join(|| first.get_variables().len(), || second.get_variables().len());
        assert_eq!((a, b), (1, 1));
        assert_eq!(second.get_variables().len(), 1);
    }
    Ok(())
}

#[test]
fn test_parallel_drops() -> Result<()> {
    let (registry, catalog, worker) = registry()?;
    catalog.load(worker)?;

    let mut instances = workers(128);
    instances
        .par_iter()
        .for_each(|instance| registry.register_instance(instance));

    let survivors: Vec<InstanceRc> = instances.drain(..64).collect();
    drop(instances);

    let snapshots: Vec<usize> = (0..16)
        .into_par_iter()
        .map(|_| registry.get_variables().len())
        .collect();
    assert!(snapshots.iter().all(|&len| len == 1 + 2 * survivors.len()));
    assert_eq!(registry.instance_count(), survivors.len());
    assert_eq!(registry.purge_dropped_instances(), 0);
    Ok(())
}
