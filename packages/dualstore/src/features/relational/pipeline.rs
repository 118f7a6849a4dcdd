//! Connection preparation pipeline
//!
//! Every code path that holds a connection runs the pipeline right after
//! acquiring it and before issuing any statement. Steps are named so the
//! sequence in use can be logged and asserted.

use std::fmt;
use std::sync::Arc;

use rusqlite::Connection;

use super::datasource::IsolationLevel;
use crate::shared::models::{DaoError, Result};

/// One named preparation step
pub trait ConnectionStep: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, conn: &Connection) -> Result<()>;
}

/// Fails with `Connectivity` unless the connection answers a trivial query
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOpen;

impl ConnectionStep for ValidateOpen {
    fn name(&self) -> &'static str {
        "validate_open"
    }

    fn apply(&self, conn: &Connection) -> Result<()> {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|err| {
                DaoError::connectivity("connection is not usable").with_source(err)
            })
    }
}

/// Force the connection's isolation level
#[derive(Debug, Clone, Copy)]
pub struct SetIsolation(pub IsolationLevel);

impl ConnectionStep for SetIsolation {
    fn name(&self) -> &'static str {
        "set_isolation"
    }

    fn apply(&self, conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "read_uncommitted", self.0.read_uncommitted())?;
        tracing::trace!(isolation = %self.0, "isolation applied");
        Ok(())
    }
}

/// Ordered list of preparation steps
#[derive(Clone, Default)]
pub struct ConnectionPipeline {
    steps: Vec<Arc<dyn ConnectionStep>>,
}

impl ConnectionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate first, then set isolation (raw-connection adapter)
    pub fn raw_connection(isolation: IsolationLevel) -> Self {
        Self::new().then(ValidateOpen).then(SetIsolation(isolation))
    }

    /// Isolation first, straight after acquisition, then validate (ORM sessions)
    pub fn session(isolation: IsolationLevel) -> Self {
        Self::new().then(SetIsolation(isolation)).then(ValidateOpen)
    }

    pub fn then(mut self, step: impl ConnectionStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn apply(&self, conn: &Connection) -> Result<()> {
        for step in &self.steps {
            step.apply(conn)?;
        }
        Ok(())
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for ConnectionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}
