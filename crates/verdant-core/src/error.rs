//! Error types for the Verdant certification workflow.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerdantError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// The subject is authenticated but has not completed profile setup.
    #[error("Profile not set up for user {user_id}")]
    ProfileNotSetUp { user_id: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation failed on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A concurrent writer moved the entity first; reload and retry.
    #[error("Conflict: {entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VerdantError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Only a lost race is worth retrying; every other failure is
    /// deterministic for the same input and state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

pub type VerdantResult<T> = Result<T, VerdantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflict_is_retryable() {
        let conflict = VerdantError::Conflict {
            entity: "request".into(),
            id: "x".into(),
        };
        assert!(conflict.is_retryable());
        assert!(!VerdantError::forbidden("nope").is_retryable());
        assert!(!VerdantError::validation("price_quote", "must be positive").is_retryable());
        assert!(
            !VerdantError::InvalidTransition {
                from: "approved".into(),
                to: "submitted".into(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn validation_message_names_field() {
        let err = VerdantError::validation("auditor_id", "is required");
        assert_eq!(
            err.to_string(),
            "Validation failed on `auditor_id`: is required"
        );
    }
}
