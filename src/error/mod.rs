//! Error types

pub mod types;

pub use types::{ApiError, MISSING_FIELDS_MESSAGE};
