//! Shared models

mod error;

pub use error::{DaoError, ErrorKind, Result};
