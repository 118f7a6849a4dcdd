//! Test fixtures

use std::path::{Path, PathBuf};

use dualstore::config::{DualStoreConfig, RelationalBackend};
use dualstore::features::dao::Gemstone;
use dualstore::features::relational::{DataSourceSettings, SqliteDataSource};
use dualstore::features::service::{gemstone_service, DualStoreService};
use dualstore_grid::GridCache;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Every relational adapter variant
pub const RELATIONAL_BACKENDS: [RelationalBackend; 3] = [
    RelationalBackend::RawConnection,
    RelationalBackend::OrmSession,
    RelationalBackend::OrmManagedContext,
];

/// Route `tracing` output through the test harness (`RUST_LOG=dualstore=debug`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Grid cache, data source and service wired together
pub struct Harness {
    pub cache: GridCache,
    pub data_source: SqliteDataSource,
    pub service: DualStoreService<Gemstone>,
}

/// In-memory harness with default configuration and the given backend
pub fn harness(backend: RelationalBackend) -> Harness {
    init_tracing();
    let config = DualStoreConfig::with_backend(backend);
    let cache = GridCache::new(format!("test-{}", backend.storage_backend()));
    let data_source = config.open_data_source().unwrap();
    let service = gemstone_service(&config, &cache, data_source.clone()).unwrap();
    Harness {
        cache,
        data_source,
        service,
    }
}

/// Empty directory holding a database file path
pub fn file_database() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gems.db");
    (dir, path)
}

/// Open a file-backed data source with WAL and a generous busy timeout
pub fn open_file(path: &Path) -> SqliteDataSource {
    SqliteDataSource::open(path, &DataSourceSettings::default()).unwrap()
}
