//! DAO Domain Models
//!
//! A record is any `Entity`: a value with an optional, stable identity.
//! Identity is assigned by the caller or by the store on first insert.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Record with a stable identity field
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// `None` until the caller or a store assigns one
    fn id(&self) -> Option<Self::Id>;

    fn with_id(self, id: Self::Id) -> Self;
}

/// Gemstone Entity
///
/// The record the shipped service stores in both backends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gemstone {
    /// Identity (primary key / region key)
    pub id: Option<i64>,

    /// Gem name, e.g. "DIAMOND"
    pub name: String,
}

impl Gemstone {
    /// New gemstone without identity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn with_identity(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }
}

impl Entity for Gemstone {
    type Id = i64;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl fmt::Display for Gemstone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Gemstone({}, {})", id, self.name),
            None => write!(f, "Gemstone(<new>, {})", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_id_assigns_identity() {
        let gem = Gemstone::new("RUBY");
        assert_eq!(gem.id(), None);
        assert_eq!(gem.clone().with_id(4), Gemstone::with_identity(4, "RUBY"));
        assert_eq!(gem.to_string(), "Gemstone(<new>, RUBY)");
    }
}
