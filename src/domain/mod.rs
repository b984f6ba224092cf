// Domain layer - review operations and reputation rules with no HTTP concerns

pub mod reputation;
pub mod reviews;

use crate::db::{DatabaseError, Retryable};

// Domain error type - no HTTP concerns
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DatabaseError> for DomainError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => DomainError::NotFound(what),
            other => DomainError::Database(other),
        }
    }
}

impl Retryable for DomainError {
    fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Database(e) if e.is_retryable())
    }
}

pub use reputation::{compute_reputation, determine_badges, determine_progress_level, ReviewStats};
pub use reviews::{ReputationOutcome, ReviewMutation, ReviewService};
