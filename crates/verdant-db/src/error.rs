//! Database-specific error types and conversions.

use verdant_core::error::VerdantError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed record: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    Duplicate { entity: String },

    #[error("Concurrent modification: {entity} with id {id}")]
    Conflict { entity: String, id: String },
}

impl DbError {
    /// Classify the message of a failed statement. Unique-index violations
    /// and retryable commit conflicts get their own variants.
    pub(crate) fn from_statement(entity: &str, id: &str, message: String) -> Self {
        if is_unique_violation(&message) {
            DbError::Duplicate {
                entity: entity.into(),
            }
        } else if is_retryable_conflict(&message) {
            DbError::Conflict {
                entity: entity.into(),
                id: id.into(),
            }
        } else {
            DbError::Query(message)
        }
    }
}

fn is_unique_violation(message: &str) -> bool {
    message.contains("already contains")
}

fn is_retryable_conflict(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("can be retried") || lower.contains("read or write conflict")
}

impl From<DbError> for VerdantError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => VerdantError::NotFound { entity, id },
            DbError::Duplicate { entity } => VerdantError::AlreadyExists { entity },
            DbError::Conflict { entity, id } => VerdantError::Conflict { entity, id },
            DbError::Surreal(e) if is_retryable_conflict(&e.to_string()) => {
                VerdantError::Conflict {
                    entity: "record".into(),
                    id: String::new(),
                }
            }
            other => {
                tracing::error!(error = %other, "Unexpected persistence failure");
                VerdantError::Database(other.to_string())
            }
        }
    }
}
