use thiserror::Error;
use uuid::Uuid;

use siaga_common::SiagaError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(Uuid),

    /// The document's version moved between read and conditional write.
    /// Callers running a read-modify-write loop re-read and retry on this;
    /// it is never surfaced past the engine layer.
    #[error("write conflict on document {0}")]
    Conflict(Uuid),

    #[error("write-once field `{0}` cannot change after creation")]
    ImmutableField(&'static str),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for SiagaError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SiagaError::NotFound(id),
            StoreError::ImmutableField(field) => {
                SiagaError::InvalidInput(format!("write-once field `{field}` cannot change"))
            }
            StoreError::Conflict(_) | StoreError::Unavailable(_) => {
                SiagaError::BackendUnavailable(e.to_string())
            }
        }
    }
}
