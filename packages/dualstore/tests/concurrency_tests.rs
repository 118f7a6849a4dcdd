//! Concurrent saves through per-thread services sharing one grid cache and
//! one database file

mod common;

use std::thread;

use common::*;
use dualstore::config::DualStoreConfig;
use dualstore::features::dao::{Dao, Gemstone, RegionDao};
use dualstore::features::service::{relational_dao, DualStoreService};
use dualstore::features::transaction::GridTransactionResource;
use dualstore::features::validation::approved_gemstones;
use dualstore::{TransactionBoundary, Validator};
use dualstore_grid::GridCache;
use pretty_assertions::assert_eq;

const THREADS: i64 = 4;
const SAVES_PER_THREAD: i64 = 25;

/// Service for one worker thread: its own data source and boundary, shared grid
fn worker_service(
    config: &DualStoreConfig,
    cache: &GridCache,
    grid: &RegionDao<Gemstone>,
    path: &std::path::Path,
) -> DualStoreService<Gemstone> {
    let data_source = open_file(path);
    let relational = relational_dao::<Gemstone>(data_source.clone(), &config.relational);
    let boundary = TransactionBoundary::new()
        .enlist(data_source)
        .enlist(GridTransactionResource::from_cache(cache));
    let validator = Validator::new().with_rule(approved_gemstones(&config.validation.allowed_names));
    DualStoreService::new(grid.clone(), relational, validator, boundary)
}

#[test]
fn test_concurrent_saves_with_disjoint_identities() {
    init_tracing();

    for backend in RELATIONAL_BACKENDS {
        let (_dir, path) = file_database();
        let config = DualStoreConfig::with_backend(backend);
        let cache = GridCache::new(format!("concurrent-{:?}", backend));
        let region = cache.create_region::<i64, Gemstone>("Gemstones").unwrap();
        let grid = RegionDao::with_sequence(region, 1);
        open_file(&path).ensure_table::<Gemstone>().unwrap();

        thread::scope(|scope| {
            for worker in 0..THREADS {
                let service = worker_service(&config, &cache, &grid, &path);
                scope.spawn(move || {
                    for n in 0..SAVES_PER_THREAD {
                        let id = worker * SAVES_PER_THREAD + n + 1;
                        service
                            .save(Gemstone::with_identity(id, "SAPPHIRE"))
                            .unwrap();
                        // Every fourth save is rejected and must leave no trace
                        if n % 4 == 0 {
                            let err = service
                                .save(Gemstone::with_identity(id + 10_000, "Glass"))
                                .unwrap_err();
                            assert!(err.is_validation());
                        }
                    }
                });
            }
        });

        let check = worker_service(&config, &cache, &grid, &path);
        assert_counts(&check, (THREADS * SAVES_PER_THREAD) as usize);
        let ids: Vec<i64> = check
            .relational()
            .find_all()
            .unwrap()
            .iter()
            .map(|g| g.unwrap().id.unwrap())
            .collect();
        assert_eq!(ids, (1..=THREADS * SAVES_PER_THREAD).collect::<Vec<_>>());
    }
}

#[test]
fn test_grid_transactions_are_per_thread() {
    init_tracing();
    let (_dir, path) = file_database();
    let config = DualStoreConfig::default();
    let cache = GridCache::new("per-thread");
    let region = cache.create_region::<i64, Gemstone>("Gemstones").unwrap();
    let grid = RegionDao::with_sequence(region, 1);
    open_file(&path).ensure_table::<Gemstone>().unwrap();

    thread::scope(|scope| {
        let accepted = worker_service(&config, &cache, &grid, &path);
        let rejected = worker_service(&config, &cache, &grid, &path);

        scope.spawn(move || {
            for id in 1..=20 {
                accepted.save(Gemstone::with_identity(id, "RUBY")).unwrap();
            }
        });
        scope.spawn(move || {
            for id in 101..=120 {
                assert!(rejected.save(Gemstone::with_identity(id, "Brick")).is_err());
            }
        });
    });

    // Rolling back one thread's grid transaction never undoes another's writes
    assert_eq!(grid.count().unwrap(), 20);
    assert_eq!(grid.find_by(&101).unwrap(), None);
}
