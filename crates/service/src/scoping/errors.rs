use thiserror::Error;

use super::domain::SessionStatus;

/// Business errors for the scoping lifecycle and magic-link workflows.
#[derive(Debug, Error)]
pub enum ScopingError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("invalid transition from {from:?} to {to:?}")]
    StateConflict { from: SessionStatus, to: SessionStatus },
    #[error("grant expired")]
    Expired,
    #[error("repository error: {0}")]
    Repository(String),
}

impl ScopingError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            ScopingError::Validation(_) => 2001,
            ScopingError::NotFound => 2002,
            ScopingError::StateConflict { .. } => 2003,
            ScopingError::Expired => 2004,
            ScopingError::Repository(_) => 2200,
        }
    }
}

impl From<models::errors::ModelError> for ScopingError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Validation(msg) => ScopingError::Validation(msg),
            models::errors::ModelError::NotFound(_) => ScopingError::NotFound,
            models::errors::ModelError::Db(msg) => ScopingError::Repository(msg),
        }
    }
}
