//! The request lifecycle as a closed transition table.
//!
//! Every legal status change is one [`Edge`] in [`TRANSITIONS`]. Anything
//! not listed is illegal. Each non-terminal status has exactly one
//! responsible [`Party`]; who may act is decided from the *current* status,
//! before the target is even looked at.

use serde::{Deserialize, Serialize};

use crate::context::Actor;
use crate::models::file::FileCategory;
use crate::models::profile::Role;
use crate::models::request::{Request, RequestStatus};

use Field::{AdminComment, AuditorId, Findings, PriceQuote};
use RequestStatus as S;

/// Named workflow actions, one per edge kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SendQuote,
    RecordContract,
    CompleteFileUpload,
    AssignAuditor,
    StartAudit,
    SubmitAudit,
    Approve,
    Reject,
    IssueCertificate,
}

/// Who is entitled to move a request out of a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Admin,
    /// The request's owner, and nobody else with the owner role.
    Owner,
    /// The auditor recorded on the request, and no other auditor.
    AssignedAuditor,
}

impl Party {
    pub fn admits(&self, actor: &Actor, request: &Request) -> bool {
        match self {
            Party::Admin => actor.role == Role::Admin,
            Party::Owner => actor.role == Role::Owner && actor.user_id == request.user_id,
            Party::AssignedAuditor => {
                actor.role == Role::Auditor
                    && request.auditor_id.as_deref() == Some(actor.user_id.as_str())
            }
        }
    }
}

/// Payload fields a transition may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    PriceQuote,
    AuditorId,
    AdminComment,
    Findings,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::PriceQuote => "price_quote",
            Field::AuditorId => "auditor_id",
            Field::AdminComment => "admin_comment",
            Field::Findings => "findings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub action: Action,
    pub from: RequestStatus,
    pub to: RequestStatus,
    /// Fields that must be present.
    pub requires: &'static [Field],
    /// Fields that may be present (superset of `requires`).
    pub accepts: &'static [Field],
    /// A file of this category must already be recorded on the request.
    pub prerequisite_file: Option<FileCategory>,
}

pub const TRANSITIONS: &[Edge] = &[
    Edge {
        action: Action::SendQuote,
        from: S::Submitted,
        to: S::Quoted,
        requires: &[PriceQuote],
        accepts: &[PriceQuote, AdminComment],
        prerequisite_file: None,
    },
    Edge {
        action: Action::RecordContract,
        from: S::Quoted,
        to: S::ContractSigned,
        requires: &[],
        accepts: &[AdminComment],
        prerequisite_file: Some(FileCategory::Contract),
    },
    Edge {
        action: Action::CompleteFileUpload,
        from: S::ContractSigned,
        to: S::FilesUploaded,
        requires: &[],
        accepts: &[],
        prerequisite_file: Some(FileCategory::ProjectFile),
    },
    Edge {
        action: Action::AssignAuditor,
        from: S::FilesUploaded,
        to: S::AuditorAssigned,
        requires: &[AuditorId],
        accepts: &[AuditorId, AdminComment],
        prerequisite_file: None,
    },
    Edge {
        action: Action::StartAudit,
        from: S::AuditorAssigned,
        to: S::AuditInProgress,
        requires: &[],
        accepts: &[],
        prerequisite_file: None,
    },
    Edge {
        action: Action::SubmitAudit,
        from: S::AuditorAssigned,
        to: S::AuditSubmitted,
        requires: &[Findings],
        accepts: &[Findings],
        prerequisite_file: None,
    },
    Edge {
        action: Action::SubmitAudit,
        from: S::AuditInProgress,
        to: S::AuditSubmitted,
        requires: &[Findings],
        accepts: &[Findings],
        prerequisite_file: None,
    },
    Edge {
        action: Action::Approve,
        from: S::AuditSubmitted,
        to: S::Approved,
        requires: &[],
        accepts: &[AdminComment],
        prerequisite_file: None,
    },
    Edge {
        action: Action::Reject,
        from: S::AuditSubmitted,
        to: S::Rejected,
        requires: &[],
        accepts: &[AdminComment],
        prerequisite_file: None,
    },
    Edge {
        action: Action::IssueCertificate,
        from: S::Approved,
        to: S::CertificateIssued,
        requires: &[],
        accepts: &[AdminComment],
        prerequisite_file: Some(FileCategory::Certificate),
    },
];

/// The party allowed to act on a request in `status`; `None` for
/// terminal statuses.
pub fn responsible_party(status: RequestStatus) -> Option<Party> {
    match status {
        S::Submitted | S::Quoted | S::FilesUploaded | S::AuditSubmitted | S::Approved => {
            Some(Party::Admin)
        }
        S::ContractSigned => Some(Party::Owner),
        S::AuditorAssigned | S::AuditInProgress => Some(Party::AssignedAuditor),
        S::Rejected | S::CertificateIssued => None,
    }
}

pub fn find_edge(from: RequestStatus, to: RequestStatus) -> Option<&'static Edge> {
    TRANSITIONS.iter().find(|e| e.from == from && e.to == to)
}

pub fn edges_from(from: RequestStatus) -> impl Iterator<Item = &'static Edge> {
    TRANSITIONS.iter().filter(move |e| e.from == from)
}

/// Admins see every request, owners their own, auditors the ones they
/// are assigned to.
pub fn is_visible_to(request: &Request, actor: &Actor) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Owner => request.user_id == actor.user_id,
        Role::Auditor => request.auditor_id.as_deref() == Some(actor.user_id.as_str()),
    }
}

/// Actions `actor` may take on `request` right now.
pub fn allowed_actions(request: &Request, actor: &Actor) -> Vec<Action> {
    let Some(party) = responsible_party(request.status) else {
        return Vec::new();
    };
    if !party.admits(actor, request) {
        return Vec::new();
    }
    let mut actions: Vec<Action> = Vec::new();
    for edge in edges_from(request.status) {
        if !actions.contains(&edge.action) {
            actions.push(edge.action);
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn request(status: RequestStatus, auditor: Option<&str>) -> Request {
        Request {
            id: Uuid::new_v4(),
            user_id: "owner-1".into(),
            auditor_id: auditor.map(Into::into),
            status,
            project_type: "Warehouse".into(),
            project_area: None,
            location: None,
            description: None,
            price_quote: None,
            admin_comment: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn every_edge_moves_forward() {
        for edge in TRANSITIONS {
            assert!(edge.from < edge.to, "{:?} goes backwards", edge);
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for status in RequestStatus::ALL.into_iter().filter(RequestStatus::is_terminal) {
            assert_eq!(edges_from(status).count(), 0);
            assert!(responsible_party(status).is_none());
        }
    }

    #[test]
    fn non_terminal_states_have_a_party_and_an_edge() {
        for status in RequestStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(responsible_party(status).is_some(), "{status} has no party");
            assert!(edges_from(status).count() > 0, "{status} is a dead end");
        }
    }

    #[test]
    fn rejected_only_reachable_from_audit_submitted() {
        let sources: Vec<_> = TRANSITIONS
            .iter()
            .filter(|e| e.to == RequestStatus::Rejected)
            .map(|e| e.from)
            .collect();
        assert_eq!(sources, vec![RequestStatus::AuditSubmitted]);
    }

    #[test]
    fn required_fields_are_accepted() {
        for edge in TRANSITIONS {
            for field in edge.requires {
                assert!(edge.accepts.contains(field), "{:?} requires unaccepted {:?}", edge.action, field);
            }
        }
    }

    #[test]
    fn edges_are_unique_per_pair() {
        for (i, a) in TRANSITIONS.iter().enumerate() {
            for b in &TRANSITIONS[i + 1..] {
                assert!(!(a.from == b.from && a.to == b.to), "duplicate edge {:?}", a);
            }
        }
    }

    #[test]
    fn owner_party_admits_only_the_owning_user() {
        let req = request(RequestStatus::ContractSigned, None);
        assert!(Party::Owner.admits(&Actor::new("owner-1", Role::Owner), &req));
        assert!(!Party::Owner.admits(&Actor::new("owner-2", Role::Owner), &req));
        assert!(!Party::Owner.admits(&Actor::new("owner-1", Role::Admin), &req));
    }

    #[test]
    fn assigned_auditor_party_requires_matching_id() {
        let req = request(RequestStatus::AuditorAssigned, Some("aud-1"));
        assert!(Party::AssignedAuditor.admits(&Actor::new("aud-1", Role::Auditor), &req));
        assert!(!Party::AssignedAuditor.admits(&Actor::new("aud-2", Role::Auditor), &req));
    }

    #[test]
    fn allowed_actions_for_assigned_auditor() {
        let req = request(RequestStatus::AuditorAssigned, Some("aud-1"));
        let actions = allowed_actions(&req, &Actor::new("aud-1", Role::Auditor));
        assert_eq!(actions, vec![Action::StartAudit, Action::SubmitAudit]);
        assert!(allowed_actions(&req, &Actor::new("admin", Role::Admin)).is_empty());
    }

    #[test]
    fn allowed_actions_for_admin_on_audit_submitted() {
        let req = request(RequestStatus::AuditSubmitted, Some("aud-1"));
        let actions = allowed_actions(&req, &Actor::new("admin", Role::Admin));
        assert_eq!(actions, vec![Action::Approve, Action::Reject]);
    }

    #[test]
    fn no_actions_on_terminal_request() {
        let req = request(RequestStatus::CertificateIssued, Some("aud-1"));
        assert!(allowed_actions(&req, &Actor::new("admin", Role::Admin)).is_empty());
    }

    #[test]
    fn visibility_follows_role_scope() {
        let req = request(RequestStatus::AuditorAssigned, Some("aud-1"));
        assert!(is_visible_to(&req, &Actor::new("admin", Role::Admin)));
        assert!(is_visible_to(&req, &Actor::new("owner-1", Role::Owner)));
        assert!(is_visible_to(&req, &Actor::new("aud-1", Role::Auditor)));
        assert!(!is_visible_to(&req, &Actor::new("owner-2", Role::Owner)));
        assert!(!is_visible_to(&req, &Actor::new("aud-2", Role::Auditor)));
    }
}
