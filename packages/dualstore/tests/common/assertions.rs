//! Custom assertions for test verification

use dualstore::features::dao::Gemstone;
use dualstore::features::service::DualStoreService;

/// Assert both stores hold the expected number of records
pub fn assert_counts(service: &DualStoreService<Gemstone>, expected: usize) {
    assert_eq!(
        service.grid_count().unwrap(),
        expected,
        "grid count mismatch"
    );
    assert_eq!(
        service.relational_count().unwrap(),
        expected,
        "relational count mismatch ({})",
        service.relational_backend()
    );
}

/// Assert `gem` is stored identically in both stores
pub fn assert_stored_in_both(service: &DualStoreService<Gemstone>, gem: &Gemstone) {
    let id = gem.id.expect("stored gem has an identity");
    assert_eq!(service.find_in_grid(&id).unwrap().as_ref(), Some(gem));
    assert_eq!(service.find_in_relational(&id).unwrap().as_ref(), Some(gem));
}

/// Assert `id` is absent from both stores
pub fn assert_absent_from_both(service: &DualStoreService<Gemstone>, id: i64) {
    assert_eq!(service.find_in_grid(&id).unwrap(), None);
    assert_eq!(service.find_in_relational(&id).unwrap(), None);
}
