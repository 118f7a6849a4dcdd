//! Test data builders

use dualstore::features::dao::Gemstone;

/// Gemstones without identity
pub fn gems(names: &[&str]) -> Vec<Gemstone> {
    names.iter().map(|name| Gemstone::new(*name)).collect()
}

/// Gemstones with identities `ids`, all named `name`
pub fn numbered_gems(ids: impl IntoIterator<Item = i64>, name: &str) -> Vec<Gemstone> {
    ids.into_iter()
        .map(|id| Gemstone::with_identity(id, name))
        .collect()
}
