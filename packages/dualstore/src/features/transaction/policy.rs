//! Which failures undo a unit of work
//!
//! Unchecked failures roll back; checked ones (by default
//! `ErrorKind::Application`, the caller's own declared failure) let the
//! writes made so far commit before the error is returned.

use serde::{Deserialize, Serialize};

use crate::shared::models::{DaoError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackPolicy {
    no_rollback_for: Vec<ErrorKind>,
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self {
            no_rollback_for: vec![ErrorKind::Application],
        }
    }
}

impl RollbackPolicy {
    /// Commit on the listed kinds, roll back on everything else
    pub fn no_rollback_for(kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        Self {
            no_rollback_for: kinds.into_iter().collect(),
        }
    }

    /// Roll back on every failure
    pub fn rollback_on_any() -> Self {
        Self::no_rollback_for([])
    }

    pub fn committing_kinds(&self) -> &[ErrorKind] {
        &self.no_rollback_for
    }

    pub fn rolls_back(&self, err: &DaoError) -> bool {
        !self.no_rollback_for.contains(&err.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RollbackPolicy::default();
        assert!(policy.rolls_back(&DaoError::validation("bad")));
        assert!(policy.rolls_back(&DaoError::connectivity("down")));
        assert!(policy.rolls_back(&DaoError::integrity_violation("dup")));
        assert!(!policy.rolls_back(&DaoError::application("declared")));
    }

    #[test]
    fn test_rollback_on_any() {
        let policy = RollbackPolicy::rollback_on_any();
        assert!(policy.rolls_back(&DaoError::application("declared")));
        assert!(policy.committing_kinds().is_empty());
    }
}
