//! Relational backend (SQLite)
//!
//! - `datasource`: single-connection data source, also a transactional resource
//! - `pipeline`: named connection-preparation steps
//! - `mapping`: entity ↔ table statements
//! - `session`: explicit-transaction ORM session
//! - `entity_manager`: managed context with write-behind flush

pub mod datasource;
pub mod entity_manager;
pub mod mapping;
pub mod pipeline;
pub mod session;

pub use datasource::{DataSourceSettings, IsolationLevel, SqliteDataSource};
pub use entity_manager::{EntityManager, EntityManagerFactory};
pub use mapping::SqlEntity;
pub use pipeline::{ConnectionPipeline, ConnectionStep, SetIsolation, ValidateOpen};
pub use session::{Session, SessionFactory};
