//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while normalizing records from the store.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid color string: {0:?}")]
    InvalidColor(String),
}
