//! Building a file-backed service from a YAML configuration

mod common;

use common::*;
use dualstore::config::{DualStoreConfig, RelationalBackend};
use dualstore::features::dao::{Dao, Gemstone};
use dualstore::features::relational::IsolationLevel;
use dualstore::{gemstone_service, DaoError, ErrorKind};
use dualstore_grid::GridCache;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_config(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("dualstore.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_service_from_yaml_persists_to_file() {
    init_tracing();
    let (dir, db_path) = file_database();
    let yaml = format!(
        r#"
version: 1
relational:
  backend: orm_managed_context
  path: {}
  isolation: serializable
grid:
  region: Jewels
  key_start: 100
validation:
  allowed_names: [DIAMOND, JADE]
"#,
        db_path.display()
    );
    let config = DualStoreConfig::from_yaml(write_config(&dir, &yaml)).unwrap();
    assert_eq!(config.relational.backend, RelationalBackend::OrmManagedContext);
    assert_eq!(config.relational.isolation, IsolationLevel::Serializable);

    let cache = GridCache::new("yaml");
    let service =
        gemstone_service(&config, &cache, config.open_data_source().unwrap()).unwrap();

    let jade = service.save(Gemstone::new("jade")).unwrap();
    assert_eq!(jade.id, Some(100));
    assert!(service.save(Gemstone::new("RUBY")).unwrap_err().is_validation());
    assert_eq!(cache.region_names(), vec!["Jewels".to_string()]);

    // A second data source on the same file sees the committed row
    let reopened = open_file(&db_path);
    let rows: i64 = reopened
        .connection()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM gemstones", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn test_reopened_database_keeps_existing_rows() {
    init_tracing();
    let (_dir, db_path) = file_database();
    let mut config = DualStoreConfig::with_backend(RelationalBackend::RawConnection);
    config.relational.path = Some(db_path.clone());

    let first_run = GridCache::new("first-run");
    let diamond = {
        let service =
            gemstone_service(&config, &first_run, config.open_data_source().unwrap()).unwrap();
        service.save(Gemstone::new("DIAMOND")).unwrap()
    };
    assert_eq!(diamond.id, Some(1));

    for backend in RELATIONAL_BACKENDS {
        config.relational.backend = backend;
        // Fresh grid over the populated file, as after a restart
        let cache = GridCache::new(format!("restart-{:?}", backend));
        let service =
            gemstone_service(&config, &cache, config.open_data_source().unwrap()).unwrap();

        let before = service.relational_count().unwrap();
        let ruby = service.save(Gemstone::new("RUBY")).unwrap();

        assert_eq!(ruby.id, Some(before as i64 + 1), "{:?}", backend);
        assert_eq!(service.relational_count().unwrap(), before + 1);
        assert_eq!(service.find_in_relational(&1).unwrap(), Some(diamond.clone()));
    }
}

#[test]
fn test_empty_no_rollback_list_rolls_back_application_errors() {
    init_tracing();
    let config = DualStoreConfig::from_yaml_str(
        r#"
version: 1
transaction:
  no_rollback_for: []
"#,
    )
    .unwrap();

    let cache = GridCache::new("strict");
    let service =
        gemstone_service(&config, &cache, config.open_data_source().unwrap()).unwrap();

    let err = service
        .boundary()
        .execute(|_| -> dualstore::Result<()> {
            let stored = service.grid().save(Gemstone::new("OPAL"))?;
            service.relational().save(stored)?;
            Err(DaoError::application("downstream refused"))
        })
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Application);
    assert_counts(&service, 0);
}

#[test]
fn test_invalid_yaml_settings_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "version: 1\nrelational:\n  batch_chunk_rows: 0\n",
    );
    assert!(DualStoreConfig::from_yaml(path).is_err());

    assert!(DualStoreConfig::from_yaml_str("version: 7\n").is_err());
    assert!(DualStoreConfig::from_yaml_str("version: 1\nunknown: true\n").is_err());
}
