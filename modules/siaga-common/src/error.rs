use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SiagaError {
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Write failed: commit budget exhausted after {attempts} attempts")]
    WriteFailed { attempts: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
