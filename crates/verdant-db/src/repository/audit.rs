//! SurrealDB implementation of [`AuditRepository`].
//!
//! An audit shares its record key with the request it belongs to, so a
//! request can never carry more than one. Submitting writes the audit and
//! moves the request inside one transaction; the guarded status update
//! throws when it matches nothing, which cancels both writes.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use verdant_core::error::VerdantResult;
use verdant_core::models::audit::{Audit, AuditSubmission, Checklist};
use verdant_core::models::request::{Request, StatusChange};
use verdant_core::repository::AuditRepository;

use super::request::{quote_to_db, transition_sets, RequestRow};
use crate::error::DbError;

const GUARD_FAILED: &str = "request no longer matches the expected status";

#[derive(Debug, SurrealValue)]
struct AuditRow {
    request_id: String,
    auditor_id: String,
    checklist: serde_json::Value,
    conclusion: Option<String>,
    submitted_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_audit(self, id: Uuid) -> Result<Audit, DbError> {
        let request_id = Uuid::parse_str(&self.request_id)
            .map_err(|e| DbError::Decode(format!("invalid request UUID: {e}")))?;
        let checklist: Checklist = serde_json::from_value(self.checklist)
            .map_err(|e| DbError::Decode(format!("malformed checklist: {e}")))?;
        Ok(Audit {
            id,
            request_id,
            auditor_id: self.auditor_id,
            checklist,
            conclusion: self.conclusion,
            submitted_at: self.submitted_at,
        })
    }
}

/// SurrealDB implementation of the Audit repository.
#[derive(Clone)]
pub struct SurrealAuditRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// A cancelled transaction reports on every statement, so the request
    /// is re-read to tell a missing request or a moved guard from a real
    /// failure.
    async fn classify_failure(
        &self,
        request_id: Uuid,
        change: &StatusChange,
        auditor_id: &str,
        message: String,
    ) -> Result<DbError, DbError> {
        let id_str = request_id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('request', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<RequestRow> = result.take(0)?;
        Ok(match rows.first() {
            None => DbError::NotFound {
                entity: "request".into(),
                id: id_str,
            },
            Some(row) if !row.matches_guard(change.from, Some(auditor_id)) => DbError::Conflict {
                entity: "request".into(),
                id: id_str,
            },
            Some(_) => DbError::from_statement("audit", &id_str, message),
        })
    }
}

impl<C: Connection> AuditRepository for SurrealAuditRepository<C> {
    async fn find_by_request_id(&self, request_id: Uuid) -> VerdantResult<Option<Audit>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('audit', $id)")
            .bind(("id", request_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let audit = rows
            .into_iter()
            .next()
            .map(|r| r.into_audit(request_id))
            .transpose()?;
        Ok(audit)
    }

    async fn submit_with_transition(
        &self,
        submission: AuditSubmission,
        change: StatusChange,
    ) -> VerdantResult<(Audit, Request)> {
        let request_id = submission.request_id;
        let id_str = request_id.to_string();
        let auditor_id = submission.auditor_id.clone();

        let checklist = serde_json::to_value(&submission.findings.checklist)
            .map_err(|e| DbError::Query(format!("unserializable checklist: {e}")))?;

        let query = format!(
            "BEGIN TRANSACTION; \
             LET $moved = (UPDATE type::record('request', $id) SET {} \
                 WHERE status = $from AND auditor_id = $auditor_id); \
             IF array::len($moved) = 0 {{ THROW '{GUARD_FAILED}'; }}; \
             UPSERT type::record('audit', $id) SET \
                 request_id = $id, auditor_id = $auditor_id, \
                 checklist = $checklist, conclusion = $conclusion, \
                 submitted_at = time::now(); \
             COMMIT TRANSACTION;",
            transition_sets(&change)
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("from", change.from.as_str().to_string()))
            .bind(("to", change.to.as_str().to_string()))
            .bind(("auditor_id", submission.auditor_id))
            .bind(("checklist", checklist))
            .bind(("conclusion", submission.findings.conclusion));

        if let Some(price_quote) = quote_to_db(change.price_quote)? {
            builder = builder.bind(("price_quote", price_quote));
        }
        if let Some(admin_comment) = &change.admin_comment {
            builder = builder.bind(("admin_comment", admin_comment.clone()));
        }

        let result = builder.await.map_err(DbError::from)?;
        if let Err(e) = result.check() {
            return Err(self
                .classify_failure(request_id, &change, &auditor_id, e.to_string())
                .await?
                .into());
        }

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('audit', $id); \
                 SELECT * FROM type::record('request', $id);",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let audits: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let requests: Vec<RequestRow> = result.take(1).map_err(DbError::from)?;

        let audit = audits.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit".into(),
            id: id_str.clone(),
        })?;
        let request = requests.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "request".into(),
            id: id_str,
        })?;

        Ok((audit.into_audit(request_id)?, request.into_request(request_id)?))
    }
}
