//! DualStoreService - the dual-store write coordinator
//!
//! `save` runs inside one transaction boundary:
//!
//! 1. WriteGrid        region adapter `save` (assigns identity if absent)
//! 2. WriteRelational  relational adapter `save` of the grid's result
//! 3. Validate         every rule against the stored record
//! 4. Decide           commit both, or roll both back and return the error
//!
//! Consistency comes from this convention, not from an atomic commit
//! protocol. Between steps 1 and 4 other readers can see the unvalidated
//! record: grid writes are applied to the shared region immediately, and the
//! relational write is visible on the shared connection.

use std::fmt;

use crate::features::dao::domain::models::Entity;
use crate::features::dao::domain::ports::{Dao, StorageBackend};
use crate::features::dao::infrastructure::region_dao::RegionDao;
use crate::features::transaction::boundary::TransactionBoundary;
use crate::features::validation::rules::Validator;
use crate::shared::models::Result;

/// Steps of a coordinated save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    WriteGrid,
    WriteRelational,
    Validate,
    Decide,
}

impl SavePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavePhase::WriteGrid => "write_grid",
            SavePhase::WriteRelational => "write_relational",
            SavePhase::Validate => "validate",
            SavePhase::Decide => "decide",
        }
    }
}

impl fmt::Display for SavePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct DualStoreService<T: Entity> {
    grid: RegionDao<T>,
    relational: Box<dyn Dao<T>>,
    validator: Validator<T>,
    boundary: TransactionBoundary,
}

impl<T: Entity> DualStoreService<T> {
    /// `boundary` must enlist the grid's transaction manager and the data
    /// source the relational adapter writes through.
    pub fn new(
        grid: RegionDao<T>,
        relational: Box<dyn Dao<T>>,
        validator: Validator<T>,
        boundary: TransactionBoundary,
    ) -> Self {
        Self {
            grid,
            relational,
            validator,
            boundary,
        }
    }

    /// Write `record` to both stores, validate, then commit or roll back both
    pub fn save(&self, record: T) -> Result<T> {
        let result = self.boundary.execute(|ctx| {
            let tx = ctx.id();

            tracing::debug!(%tx, phase = %SavePhase::WriteGrid, "save phase");
            let stored = self.grid.save(record)?;

            tracing::debug!(
                %tx,
                phase = %SavePhase::WriteRelational,
                id = ?stored.id(),
                backend = %self.relational.backend(),
                "save phase"
            );
            let stored = self.relational.save(stored)?;

            tracing::debug!(%tx, phase = %SavePhase::Validate, rules = ?self.validator.rule_names(), "save phase");
            self.validator.validate(&stored)?;

            Ok(stored)
        });

        match &result {
            Ok(stored) => {
                tracing::info!(phase = %SavePhase::Decide, id = ?stored.id(), "save committed")
            }
            Err(err) => tracing::info!(
                phase = %SavePhase::Decide,
                kind = %err.kind,
                error = %err,
                "save failed"
            ),
        }
        result
    }

    pub fn grid(&self) -> &RegionDao<T> {
        &self.grid
    }

    pub fn relational(&self) -> &dyn Dao<T> {
        self.relational.as_ref()
    }

    pub fn relational_backend(&self) -> StorageBackend {
        self.relational.backend()
    }

    pub fn validator(&self) -> &Validator<T> {
        &self.validator
    }

    pub fn boundary(&self) -> &TransactionBoundary {
        &self.boundary
    }

    /// Region size; fails with `TransactionInProgress` inside a boundary
    pub fn grid_count(&self) -> Result<usize> {
        self.grid.count()
    }

    pub fn relational_count(&self) -> Result<usize> {
        self.relational.count()
    }

    pub fn find_in_grid(&self, id: &T::Id) -> Result<Option<T>> {
        self.grid.find_by(id)
    }

    pub fn find_in_relational(&self, id: &T::Id) -> Result<Option<T>> {
        self.relational.find_by(id)
    }
}

impl<T: Entity> fmt::Debug for DualStoreService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualStoreService")
            .field("grid", &self.grid)
            .field("relational", &self.relational.backend())
            .field("validator", &self.validator)
            .field("boundary", &self.boundary)
            .finish()
    }
}
