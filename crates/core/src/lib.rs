pub mod aggregate;
pub mod error;
pub mod export;
pub mod formats;
pub mod models;
pub mod probe;
pub mod progress;
pub mod scan;
pub mod walk;

pub use crate::error::{Error, ProbeError, Result};
pub use crate::models::*;
