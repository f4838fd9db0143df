//! Workflow rule violations.

use thiserror::Error;
use verdant_core::error::VerdantError;
use verdant_core::models::file::FileCategory;
use verdant_core::models::profile::Role;
use verdant_core::models::request::RequestStatus;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("only the request's owner may act in status {status}")]
    NotRequestOwner { status: RequestStatus },

    #[error("only the request's assigned auditor may act in status {status}")]
    NotAssignedAuditor { status: RequestStatus },

    #[error("role {role} may not act on a request in status {status}")]
    RoleMismatch { role: Role, status: RequestStatus },

    #[error("request is in terminal status {status}")]
    TerminalState {
        status: RequestStatus,
        target: RequestStatus,
    },

    #[error("no transition from {from} to {to}")]
    NoSuchEdge {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("required for this transition")]
    MissingField(&'static str),

    #[error("not accepted by this transition")]
    UnexpectedField(&'static str),

    #[error("{message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("a {category} file must be recorded first")]
    MissingPrerequisiteFile { category: FileCategory },

    #[error("{user_id} is not an auditor")]
    NotAnAuditor { user_id: String },

    #[error("role {role} may not attach {category} files")]
    CategoryNotAllowed { role: Role, category: FileCategory },

    #[error("request is not visible to this user")]
    NotVisible,
}

impl WorkflowError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

impl From<WorkflowError> for VerdantError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::NotRequestOwner { .. }
            | WorkflowError::NotAssignedAuditor { .. }
            | WorkflowError::RoleMismatch { .. }
            | WorkflowError::CategoryNotAllowed { .. }
            | WorkflowError::NotVisible => VerdantError::Forbidden {
                reason: err.to_string(),
            },
            WorkflowError::TerminalState { status, target } => VerdantError::InvalidTransition {
                from: status.to_string(),
                to: target.to_string(),
            },
            WorkflowError::NoSuchEdge { from, to } => VerdantError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            WorkflowError::MissingField(field) | WorkflowError::UnexpectedField(field) => {
                VerdantError::validation(field, err.to_string())
            }
            WorkflowError::InvalidField { field, message } => {
                VerdantError::validation(field, message)
            }
            WorkflowError::MissingPrerequisiteFile { .. } => {
                VerdantError::validation("files", err.to_string())
            }
            WorkflowError::NotAnAuditor { .. } => {
                VerdantError::validation("auditor_id", err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_failures_are_forbidden() {
        let err: VerdantError = WorkflowError::NotAssignedAuditor {
            status: RequestStatus::AuditorAssigned,
        }
        .into();
        assert!(matches!(err, VerdantError::Forbidden { .. }));
    }

    #[test]
    fn missing_file_names_the_files_field() {
        let err: VerdantError = WorkflowError::MissingPrerequisiteFile {
            category: FileCategory::Contract,
        }
        .into();
        assert!(matches!(err, VerdantError::Validation { ref field, .. } if field == "files"));
    }

    #[test]
    fn terminal_state_is_invalid_transition() {
        let err: VerdantError = WorkflowError::TerminalState {
            status: RequestStatus::Rejected,
            target: RequestStatus::Approved,
        }
        .into();
        assert!(matches!(
            err,
            VerdantError::InvalidTransition { ref from, ref to }
                if from == "rejected" && to == "approved"
        ));
    }
}
