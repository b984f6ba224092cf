use thiserror::Error;

use crate::models::UnknownTag;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Query execution error: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Integrity constraint violation: {0}")]
    IntegrityError(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl DatabaseError {
    /// Check if this is an integrity constraint violation
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Self::IntegrityError(_) => true,
            Self::QueryError(e) => {
                if let Some(db_error) = e.as_database_error() {
                    matches!(db_error.code().as_deref(),
                        Some("23505") | // unique_violation
                        Some("23503") | // foreign_key_violation
                        Some("23502")   // not_null_violation
                    )
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::IntegrityError(_) => true,
            Self::QueryError(e) => {
                if let Some(db_error) = e.as_database_error() {
                    matches!(db_error.code().as_deref(),
                        Some("40001") | // serialization_failure
                        Some("40P01") | // deadlock_detected
                        Some("23505")   // unique_violation (racing first review of a pair)
                    )
                } else {
                    matches!(e, sqlx::Error::PoolTimedOut)
                }
            }
            Self::ConnectionError(_) => true,
            _ => false,
        }
    }
}

impl From<UnknownTag> for DatabaseError {
    fn from(err: UnknownTag) -> Self {
        DatabaseError::InvalidData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(DatabaseError::IntegrityError("dup".to_string()).is_retryable());
        assert!(DatabaseError::ConnectionError("reset".to_string()).is_retryable());
        assert!(DatabaseError::QueryError(sqlx::Error::PoolTimedOut).is_retryable());

        assert!(!DatabaseError::NotFound("expert".to_string()).is_retryable());
        assert!(!DatabaseError::InvalidData("badge".to_string()).is_retryable());
        assert!(!DatabaseError::QueryError(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_unknown_tag_becomes_invalid_data() {
        let err: DatabaseError = UnknownTag {
            kind: "badge",
            tag: "NOPE".to_string(),
        }
        .into();
        assert!(matches!(err, DatabaseError::InvalidData(ref msg) if msg.contains("NOPE")));
    }
}
