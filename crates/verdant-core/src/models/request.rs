//! Certification request domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VerdantError;

/// Lifecycle status of a certification request.
///
/// Variants are declared in workflow order; `rejected` and
/// `certificate_issued` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Submitted,
    Quoted,
    ContractSigned,
    FilesUploaded,
    AuditorAssigned,
    AuditInProgress,
    AuditSubmitted,
    Approved,
    Rejected,
    CertificateIssued,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 10] = [
        RequestStatus::Submitted,
        RequestStatus::Quoted,
        RequestStatus::ContractSigned,
        RequestStatus::FilesUploaded,
        RequestStatus::AuditorAssigned,
        RequestStatus::AuditInProgress,
        RequestStatus::AuditSubmitted,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::CertificateIssued,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Submitted => "submitted",
            RequestStatus::Quoted => "quoted",
            RequestStatus::ContractSigned => "contract_signed",
            RequestStatus::FilesUploaded => "files_uploaded",
            RequestStatus::AuditorAssigned => "auditor_assigned",
            RequestStatus::AuditInProgress => "audit_in_progress",
            RequestStatus::AuditSubmitted => "audit_submitted",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::CertificateIssued => "certificate_issued",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::CertificateIssued
        )
    }

    /// Statuses in which the assigned auditor may record findings.
    pub fn accepts_audit(&self) -> bool {
        matches!(
            self,
            RequestStatus::AuditorAssigned | RequestStatus::AuditInProgress
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = VerdantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| VerdantError::validation("status", format!("unknown status: {s}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    /// Owning subject; fixed at creation.
    pub user_id: String,
    /// Assigned auditor; set by the `files_uploaded -> auditor_assigned` edge.
    pub auditor_id: Option<String>,
    pub status: RequestStatus,
    pub project_type: String,
    pub project_area: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Set by the admin on `submitted -> quoted`.
    pub price_quote: Option<u64>,
    pub admin_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub user_id: String,
    pub project_type: String,
    pub project_area: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Owner-supplied fields for a new request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewRequest {
    pub project_type: String,
    #[serde(default)]
    pub project_area: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Which requests a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestScope {
    All,
    OwnedBy(String),
    AssignedTo(String),
}

/// A guarded status change plus the side-effect fields its edge sets.
///
/// Persisted as one conditional update: the write only lands if the
/// stored status still equals `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub price_quote: Option<u64>,
    pub auditor_id: Option<String>,
    pub admin_comment: Option<String>,
}

impl StatusChange {
    pub fn new(from: RequestStatus, to: RequestStatus) -> Self {
        Self {
            from,
            to,
            price_quote: None,
            auditor_id: None,
            admin_comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&RequestStatus::AuditInProgress).unwrap();
        assert_eq!(json, "\"audit_in_progress\"");
        let back: RequestStatus = serde_json::from_str("\"certificate_issued\"").unwrap();
        assert_eq!(back, RequestStatus::CertificateIssued);
    }

    #[test]
    fn only_rejected_and_certificate_issued_are_terminal() {
        let terminal: Vec<_> = RequestStatus::ALL
            .into_iter()
            .filter(RequestStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![RequestStatus::Rejected, RequestStatus::CertificateIssued]
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("archived".parse::<RequestStatus>().is_err());
    }
}
