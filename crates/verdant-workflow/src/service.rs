//! Workflow service: request creation, status transitions, audit
//! submission and file attachment.
//!
//! Every status change follows the same order: load the request, check the
//! actor against the party responsible for the *current* status, look up
//! the edge to the target, validate the payload, check file prerequisites
//! by query, then persist through a guarded update.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use verdant_core::context::Actor;
use verdant_core::error::{VerdantError, VerdantResult};
use verdant_core::models::audit::{Audit, AuditFindings, AuditSubmission};
use verdant_core::models::file::{CreateFileRecord, FileCategory, FileRecord, NewFile};
use verdant_core::models::profile::Role;
use verdant_core::models::request::{
    CreateRequest, NewRequest, Request, RequestStatus, StatusChange,
};
use verdant_core::repository::{
    AuditRepository, FileRepository, ProfileRepository, RequestRepository,
};
use verdant_core::workflow::{Action, Edge, Field, Party, find_edge, is_visible_to, responsible_party};

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;

/// Payload of a status change. Fields the edge does not accept must be
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionInput {
    pub target: RequestStatus,
    #[serde(default)]
    pub price_quote: Option<i64>,
    #[serde(default)]
    pub auditor_id: Option<String>,
    #[serde(default)]
    pub admin_comment: Option<String>,
    #[serde(default)]
    pub findings: Option<AuditFindings>,
}

impl TransitionInput {
    /// A bare transition to `target` with no payload.
    pub fn to(target: RequestStatus) -> Self {
        Self {
            target,
            price_quote: None,
            auditor_id: None,
            admin_comment: None,
            findings: None,
        }
    }

    fn present_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.price_quote.is_some() {
            fields.push(Field::PriceQuote);
        }
        if self.auditor_id.is_some() {
            fields.push(Field::AuditorId);
        }
        if self.admin_comment.is_some() {
            fields.push(Field::AdminComment);
        }
        if self.findings.is_some() {
            fields.push(Field::Findings);
        }
        fields
    }
}

/// Workflow service.
///
/// Generic over repository implementations so that the workflow layer
/// has no dependency on the database crate.
pub struct WorkflowService<R, F, A, P>
where
    R: RequestRepository,
    F: FileRepository,
    A: AuditRepository,
    P: ProfileRepository,
{
    requests: R,
    files: F,
    audits: A,
    profiles: P,
    config: WorkflowConfig,
}

impl<R, F, A, P> WorkflowService<R, F, A, P>
where
    R: RequestRepository,
    F: FileRepository,
    A: AuditRepository,
    P: ProfileRepository,
{
    pub fn new(requests: R, files: F, audits: A, profiles: P, config: WorkflowConfig) -> Self {
        Self {
            requests,
            files,
            audits,
            profiles,
            config,
        }
    }

    /// Open a new request in `submitted`, owned by `actor`.
    pub async fn create_request(&self, actor: &Actor, input: NewRequest) -> VerdantResult<Request> {
        if actor.role != Role::Owner {
            return Err(VerdantError::forbidden("only owners may create requests"));
        }
        if input.project_type.trim().is_empty() {
            return Err(VerdantError::validation("project_type", "must not be empty"));
        }

        let request = self
            .requests
            .create(CreateRequest {
                user_id: actor.user_id.clone(),
                project_type: input.project_type,
                project_area: input.project_area,
                location: input.location,
                description: input.description,
            })
            .await?;

        info!(
            request_id = %request.id,
            actor_id = %actor.user_id,
            project_type = %request.project_type,
            "Request created"
        );
        Ok(request)
    }

    /// Move a request to `input.target`.
    pub async fn transition(
        &self,
        request_id: Uuid,
        actor: &Actor,
        input: TransitionInput,
    ) -> VerdantResult<Request> {
        let target = input.target;
        let (request, _) = self
            .run_transition(request_id, actor, input)
            .await
            .inspect_err(|e| log_rejection("transition", request_id, actor, target, e))?;
        Ok(request)
    }

    /// Record or replace the audit findings and move the request to
    /// `audit_submitted` in one step.
    pub async fn submit_audit(
        &self,
        request_id: Uuid,
        actor: &Actor,
        findings: AuditFindings,
    ) -> VerdantResult<Audit> {
        let target = RequestStatus::AuditSubmitted;
        let input = TransitionInput {
            findings: Some(findings),
            ..TransitionInput::to(target)
        };

        let (_, audit) = self
            .run_transition(request_id, actor, input)
            .await
            .inspect_err(|e| log_rejection("submit_audit", request_id, actor, target, e))?;

        audit.ok_or_else(|| VerdantError::Internal("audit submission stored no audit".into()))
    }

    /// The assigned auditor marks the audit as started.
    pub async fn start_audit(&self, request_id: Uuid, actor: &Actor) -> VerdantResult<Request> {
        self.transition(request_id, actor, TransitionInput::to(RequestStatus::AuditInProgress))
            .await
    }

    /// Record metadata of a file already uploaded to object storage.
    pub async fn attach_file(
        &self,
        request_id: Uuid,
        actor: &Actor,
        file: NewFile,
    ) -> VerdantResult<FileRecord> {
        let result: VerdantResult<FileRecord> = async {
            let request = self.requests.get_by_id(request_id).await?;
            self.check_attachment(&request, actor, &file)?;
            self.record_file(&request, actor, file).await
        }
        .await;

        result.inspect_err(|e| {
            warn!(
                request_id = %request_id,
                actor_id = %actor.user_id,
                error = %e,
                "File attachment rejected"
            );
        })
    }

    /// Record the owner's project files, then advance
    /// `contract_signed -> files_uploaded`.
    pub async fn upload_project_files(
        &self,
        request_id: Uuid,
        actor: &Actor,
        files: Vec<NewFile>,
    ) -> VerdantResult<Request> {
        let target = RequestStatus::FilesUploaded;
        if files.is_empty() {
            return Err(VerdantError::validation(
                "files",
                "at least one project file is required",
            ));
        }

        // Reject before any record is written.
        let request = self.requests.get_by_id(request_id).await?;
        authorize(&request, actor, target)
            .map_err(VerdantError::from)
            .inspect_err(|e| log_rejection("upload_project_files", request_id, actor, target, e))?;
        for file in &files {
            if file.category != FileCategory::ProjectFile {
                return Err(VerdantError::validation(
                    "category",
                    "only project_file uploads advance the request",
                ));
            }
            self.check_attachment(&request, actor, file)?;
        }

        for file in files {
            self.record_file(&request, actor, file).await?;
        }

        self.transition(request_id, actor, TransitionInput::to(target))
            .await
    }

    /// Record the certificate file, then advance
    /// `approved -> certificate_issued`.
    pub async fn issue_certificate(
        &self,
        request_id: Uuid,
        actor: &Actor,
        file: NewFile,
    ) -> VerdantResult<Request> {
        let target = RequestStatus::CertificateIssued;
        if file.category != FileCategory::Certificate {
            return Err(VerdantError::validation(
                "category",
                "a certificate file is required",
            ));
        }

        let request = self.requests.get_by_id(request_id).await?;
        authorize(&request, actor, target)
            .map_err(VerdantError::from)
            .inspect_err(|e| log_rejection("issue_certificate", request_id, actor, target, e))?;
        self.check_attachment(&request, actor, &file)?;
        self.record_file(&request, actor, file).await?;

        self.transition(request_id, actor, TransitionInput::to(target))
            .await
    }

    async fn run_transition(
        &self,
        request_id: Uuid,
        actor: &Actor,
        input: TransitionInput,
    ) -> VerdantResult<(Request, Option<Audit>)> {
        // 1. Load the request.
        let request = self.requests.get_by_id(request_id).await?;

        // 2-3. Actor against the current status, then the edge.
        let edge = authorize(&request, actor, input.target)?;

        // 4. Payload.
        let mut change = check_payload(edge, &input, &self.config)?;
        if let Some(auditor_id) = &input.auditor_id {
            self.resolve_auditor(auditor_id).await?;
            change.auditor_id = Some(auditor_id.clone());
        }

        // 5. File prerequisites, by query.
        if self.config.enforce_file_prerequisites {
            if let Some(category) = edge.prerequisite_file {
                let count = self.files.count_by_category(request.id, category).await?;
                if count == 0 {
                    return Err(WorkflowError::MissingPrerequisiteFile { category }.into());
                }
            }
        }

        // 6. Guarded write.
        let (moved, audit) = if edge.action == Action::SubmitAudit {
            let findings = input
                .findings
                .ok_or(WorkflowError::MissingField(Field::Findings.name()))?;
            let (audit, moved) = self
                .audits
                .submit_with_transition(
                    AuditSubmission {
                        request_id: request.id,
                        auditor_id: actor.user_id.clone(),
                        findings,
                    },
                    change,
                )
                .await?;
            (moved, Some(audit))
        } else {
            (self.requests.apply_transition(request.id, change).await?, None)
        };

        info!(
            request_id = %moved.id,
            from = %edge.from,
            to = %moved.status,
            action = ?edge.action,
            actor_id = %actor.user_id,
            "Request transitioned"
        );
        Ok((moved, audit))
    }

    async fn resolve_auditor(&self, auditor_id: &str) -> VerdantResult<()> {
        let not_an_auditor = || WorkflowError::NotAnAuditor {
            user_id: auditor_id.to_string(),
        };
        match self.profiles.get_by_user_id(auditor_id).await {
            Ok(profile) if profile.role == Role::Auditor => Ok(()),
            Ok(_) | Err(VerdantError::NotFound { .. }) => Err(not_an_auditor().into()),
            Err(e) => Err(e),
        }
    }

    fn check_attachment(
        &self,
        request: &Request,
        actor: &Actor,
        file: &NewFile,
    ) -> Result<(), WorkflowError> {
        if !is_visible_to(request, actor) {
            return Err(WorkflowError::NotVisible);
        }
        if !may_attach(actor.role, file.category) {
            return Err(WorkflowError::CategoryNotAllowed {
                role: actor.role,
                category: file.category,
            });
        }
        if file.name.trim().is_empty() {
            return Err(WorkflowError::invalid("name", "must not be empty"));
        }
        if file.name.chars().count() > self.config.max_file_name_length {
            return Err(WorkflowError::invalid(
                "name",
                format!("longer than {} characters", self.config.max_file_name_length),
            ));
        }
        if file.url.trim().is_empty() {
            return Err(WorkflowError::invalid("url", "must not be empty"));
        }
        Ok(())
    }

    async fn record_file(
        &self,
        request: &Request,
        actor: &Actor,
        file: NewFile,
    ) -> VerdantResult<FileRecord> {
        let record = self
            .files
            .create(CreateFileRecord {
                request_id: request.id,
                user_id: actor.user_id.clone(),
                url: file.url,
                name: file.name,
                category: file.category,
            })
            .await?;

        info!(
            request_id = %request.id,
            file_id = %record.id,
            category = %record.category,
            actor_id = %actor.user_id,
            "File recorded"
        );
        Ok(record)
    }
}

/// Check `actor` against the party responsible for the request's current
/// status, then find the edge to `target`.
fn authorize(
    request: &Request,
    actor: &Actor,
    target: RequestStatus,
) -> Result<&'static Edge, WorkflowError> {
    let status = request.status;
    let Some(party) = responsible_party(status) else {
        return Err(WorkflowError::TerminalState { status, target });
    };

    if !party.admits(actor, request) {
        return Err(match party {
            Party::Owner if actor.role == Role::Owner => WorkflowError::NotRequestOwner { status },
            Party::AssignedAuditor if actor.role == Role::Auditor => {
                WorkflowError::NotAssignedAuditor { status }
            }
            _ => WorkflowError::RoleMismatch {
                role: actor.role,
                status,
            },
        });
    }

    find_edge(status, target).ok_or(WorkflowError::NoSuchEdge {
        from: status,
        to: target,
    })
}

/// Structural payload check for `edge`. Auditor existence is resolved by
/// the caller.
fn check_payload(
    edge: &Edge,
    input: &TransitionInput,
    config: &WorkflowConfig,
) -> Result<StatusChange, WorkflowError> {
    let present = input.present_fields();
    if let Some(field) = present.iter().find(|f| !edge.accepts.contains(f)) {
        return Err(WorkflowError::UnexpectedField(field.name()));
    }
    if let Some(field) = edge.requires.iter().find(|f| !present.contains(f)) {
        return Err(WorkflowError::MissingField(field.name()));
    }

    let mut change = StatusChange::new(edge.from, edge.to);

    if let Some(quote) = input.price_quote {
        let quote = u64::try_from(quote)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| WorkflowError::invalid("price_quote", "must be a positive integer"))?;
        change.price_quote = Some(quote);
    }

    if let Some(auditor_id) = &input.auditor_id {
        if auditor_id.trim().is_empty() {
            return Err(WorkflowError::invalid("auditor_id", "must not be empty"));
        }
    }

    if let Some(findings) = &input.findings {
        check_findings(findings, config)?;
    }

    change.admin_comment = input.admin_comment.clone();
    Ok(change)
}

fn check_findings(findings: &AuditFindings, config: &WorkflowConfig) -> Result<(), WorkflowError> {
    if findings.checklist.len() > config.max_checklist_items {
        return Err(WorkflowError::invalid(
            "findings",
            format!("checklist has more than {} items", config.max_checklist_items),
        ));
    }
    if findings.checklist.keys().any(|k| k.trim().is_empty()) {
        return Err(WorkflowError::invalid(
            "findings",
            "checklist item names must not be empty",
        ));
    }
    if let Some(conclusion) = &findings.conclusion {
        if conclusion.chars().count() > config.max_conclusion_length {
            return Err(WorkflowError::invalid(
                "findings",
                format!(
                    "conclusion is longer than {} characters",
                    config.max_conclusion_length
                ),
            ));
        }
    }
    Ok(())
}

fn may_attach(role: Role, category: FileCategory) -> bool {
    use FileCategory::{AuditReport, Certificate, Contract, Other, ProjectFile};
    match role {
        Role::Owner => matches!(category, ProjectFile | Contract | Other),
        Role::Admin => matches!(category, Contract | Certificate | Other),
        Role::Auditor => matches!(category, AuditReport | Other),
    }
}

fn log_rejection(
    operation: &'static str,
    request_id: Uuid,
    actor: &Actor,
    target: RequestStatus,
    err: &VerdantError,
) {
    // Persistence failures were already logged at error level.
    if matches!(err, VerdantError::Database(_) | VerdantError::Internal(_)) {
        return;
    }
    warn!(
        operation,
        request_id = %request_id,
        actor_id = %actor.user_id,
        target = %target,
        error = %err,
        "Transition rejected"
    );
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use chrono::Utc;

    fn request(status: RequestStatus) -> Request {
        Request {
            id: Uuid::new_v4(),
            user_id: "owner-1".into(),
            auditor_id: Some("aud-1".into()),
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

    fn edge(from: RequestStatus, to: RequestStatus) -> &'static Edge {
        find_edge(from, to).unwrap()
    }

    #[test]
    fn quote_requires_price() {
        let err = check_payload(
            edge(RequestStatus::Submitted, RequestStatus::Quoted),
            &TransitionInput::to(RequestStatus::Quoted),
            &WorkflowConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("price_quote")));
    }

    #[test]
    fn quote_must_be_positive() {
        let input = TransitionInput {
            price_quote: Some(0),
            ..TransitionInput::to(RequestStatus::Quoted)
        };
        let err = check_payload(
            edge(RequestStatus::Submitted, RequestStatus::Quoted),
            &input,
            &WorkflowConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidField { field: "price_quote", .. }));
    }

    #[test]
    fn unaccepted_field_is_named() {
        let input = TransitionInput {
            price_quote: Some(10),
            ..TransitionInput::to(RequestStatus::Approved)
        };
        let err = check_payload(
            edge(RequestStatus::AuditSubmitted, RequestStatus::Approved),
            &input,
            &WorkflowConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::UnexpectedField("price_quote")));
    }

    #[test]
    fn oversized_checklist_is_rejected() {
        let checklist: BTreeMap<String, bool> =
            (0..3).map(|i| (format!("check-{i}"), true)).collect();
        let input = TransitionInput {
            findings: Some(AuditFindings {
                checklist,
                conclusion: None,
            }),
            ..TransitionInput::to(RequestStatus::AuditSubmitted)
        };
        let config = WorkflowConfig {
            max_checklist_items: 2,
            ..WorkflowConfig::default()
        };
        let err = check_payload(
            edge(RequestStatus::AuditorAssigned, RequestStatus::AuditSubmitted),
            &input,
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidField { field: "findings", .. }));
    }

    #[test]
    fn admin_comment_is_carried_into_the_change() {
        let input = TransitionInput {
            admin_comment: Some("insufficient glazing data".into()),
            ..TransitionInput::to(RequestStatus::Rejected)
        };
        let change = check_payload(
            edge(RequestStatus::AuditSubmitted, RequestStatus::Rejected),
            &input,
            &WorkflowConfig::default(),
        )
        .unwrap();
        assert_eq!(change.to, RequestStatus::Rejected);
        assert_eq!(change.admin_comment.as_deref(), Some("insufficient glazing data"));
    }

    #[test]
    fn role_is_checked_before_the_edge() {
        let req = request(RequestStatus::Approved);
        let err = authorize(&req, &Actor::new("owner-1", Role::Owner), RequestStatus::Submitted)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::RoleMismatch { .. }));

        let err = authorize(&req, &Actor::new("admin", Role::Admin), RequestStatus::Submitted)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NoSuchEdge { .. }));
    }

    #[test]
    fn other_auditor_is_not_the_assigned_one() {
        let req = request(RequestStatus::AuditorAssigned);
        let err = authorize(
            &req,
            &Actor::new("aud-2", Role::Auditor),
            RequestStatus::AuditSubmitted,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::NotAssignedAuditor { .. }));
    }

    #[test]
    fn terminal_request_admits_nothing() {
        let req = request(RequestStatus::CertificateIssued);
        let err = authorize(&req, &Actor::new("admin", Role::Admin), RequestStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TerminalState { .. }));
    }

    #[test]
    fn attachment_categories_follow_role() {
        assert!(may_attach(Role::Owner, FileCategory::ProjectFile));
        assert!(!may_attach(Role::Owner, FileCategory::Certificate));
        assert!(may_attach(Role::Admin, FileCategory::Certificate));
        assert!(!may_attach(Role::Admin, FileCategory::AuditReport));
        assert!(may_attach(Role::Auditor, FileCategory::AuditReport));
        assert!(!may_attach(Role::Auditor, FileCategory::Contract));
    }

    #[test]
    fn transition_input_rejects_unknown_fields() {
        let json = r#"{"target":"quoted","price_quote":5000,"status":"approved"}"#;
        assert!(serde_json::from_str::<TransitionInput>(json).is_err());

        let json = r#"{"target":"quoted","price_quote":5000}"#;
        let input: TransitionInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.price_quote, Some(5000));
    }
}
