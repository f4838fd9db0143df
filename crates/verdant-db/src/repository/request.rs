//! SurrealDB implementation of [`RequestRepository`].
//!
//! Status changes are a single conditional `UPDATE ... WHERE status =
//! $from`. When that matches no row the request is re-read to tell a
//! missing request from one whose status moved underneath the caller.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use verdant_core::error::VerdantResult;
use verdant_core::models::request::{
    CreateRequest, Request, RequestScope, RequestStatus, StatusChange,
};
use verdant_core::repository::RequestRepository;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
pub(crate) struct RequestRow {
    user_id: String,
    auditor_id: Option<String>,
    status: String,
    project_type: String,
    project_area: Option<String>,
    location: Option<String>,
    description: Option<String>,
    price_quote: Option<i64>,
    admin_comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct RequestRowWithId {
    record_id: String,
    user_id: String,
    auditor_id: Option<String>,
    status: String,
    project_type: String,
    project_area: Option<String>,
    location: Option<String>,
    description: Option<String>,
    price_quote: Option<i64>,
    admin_comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<RequestStatus, DbError> {
    s.parse::<RequestStatus>()
        .map_err(|_| DbError::Decode(format!("unknown request status: {s}")))
}

fn parse_quote(quote: Option<i64>) -> Result<Option<u64>, DbError> {
    quote
        .map(|q| {
            u64::try_from(q).map_err(|_| DbError::Decode(format!("negative price quote: {q}")))
        })
        .transpose()
}

impl RequestRow {
    pub(crate) fn into_request(self, id: Uuid) -> Result<Request, DbError> {
        Ok(Request {
            id,
            user_id: self.user_id,
            auditor_id: self.auditor_id,
            status: parse_status(&self.status)?,
            project_type: self.project_type,
            project_area: self.project_area,
            location: self.location,
            description: self.description,
            price_quote: parse_quote(self.price_quote)?,
            admin_comment: self.admin_comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl RequestRow {
    /// Whether the stored row still satisfies a guarded update's `WHERE`.
    pub(crate) fn matches_guard(&self, status: RequestStatus, auditor_id: Option<&str>) -> bool {
        self.status == status.as_str()
            && auditor_id.is_none_or(|id| self.auditor_id.as_deref() == Some(id))
    }
}

impl RequestRowWithId {
    fn try_into_request(self) -> Result<Request, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid request UUID: {e}")))?;
        Ok(Request {
            id,
            user_id: self.user_id,
            auditor_id: self.auditor_id,
            status: parse_status(&self.status)?,
            project_type: self.project_type,
            project_area: self.project_area,
            location: self.location,
            description: self.description,
            price_quote: parse_quote(self.price_quote)?,
            admin_comment: self.admin_comment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Builds the `SET` list for a guarded status change. Shared with the
/// audit repository, which runs the same update inside a transaction.
pub(crate) fn transition_sets(change: &StatusChange) -> String {
    let mut sets = vec!["status = $to", "updated_at = time::now()"];
    if change.price_quote.is_some() {
        sets.push("price_quote = $price_quote");
    }
    if change.auditor_id.is_some() {
        sets.push("auditor_id = $auditor_id");
    }
    if change.admin_comment.is_some() {
        sets.push("admin_comment = $admin_comment");
    }
    sets.join(", ")
}

pub(crate) fn quote_to_db(quote: Option<u64>) -> Result<Option<i64>, DbError> {
    quote
        .map(|q| i64::try_from(q).map_err(|_| DbError::Query(format!("price quote too large: {q}"))))
        .transpose()
}

/// SurrealDB implementation of the Request repository.
#[derive(Clone)]
pub struct SurrealRequestRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRequestRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

/// Classify a guarded update that matched nothing: the request is either
/// gone or its guarded fields no longer match.
async fn classify_missed_update<C: Connection>(
    db: &Surreal<C>,
    id: Uuid,
) -> Result<DbError, DbError> {
    let id_str = id.to_string();
    let mut result = db
        .query("SELECT * FROM type::record('request', $id)")
        .bind(("id", id_str.clone()))
        .await?;

    let rows: Vec<RequestRow> = result.take(0)?;
    Ok(if rows.is_empty() {
        DbError::NotFound {
            entity: "request".into(),
            id: id_str,
        }
    } else {
        DbError::Conflict {
            entity: "request".into(),
            id: id_str,
        }
    })
}

impl<C: Connection> RequestRepository for SurrealRequestRepository<C> {
    async fn create(&self, input: CreateRequest) -> VerdantResult<Request> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('request', $id) SET \
                 user_id = $user_id, auditor_id = NONE, \
                 status = $status, \
                 project_type = $project_type, \
                 project_area = $project_area, \
                 location = $location, \
                 description = $description, \
                 price_quote = NONE, admin_comment = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id))
            .bind(("status", RequestStatus::Submitted.as_str().to_string()))
            .bind(("project_type", input.project_type))
            .bind(("project_area", input.project_area))
            .bind(("location", input.location))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("request", &id_str, e.to_string()))?;

        let rows: Vec<RequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "request".into(),
            id: id_str,
        })?;

        Ok(row.into_request(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> VerdantResult<Request> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('request', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "request".into(),
            id: id_str,
        })?;

        Ok(row.into_request(id)?)
    }

    async fn list(&self, scope: RequestScope) -> VerdantResult<Vec<Request>> {
        let (filter, subject) = match scope {
            RequestScope::All => ("", None),
            RequestScope::OwnedBy(user_id) => ("WHERE user_id = $subject", Some(user_id)),
            RequestScope::AssignedTo(user_id) => ("WHERE auditor_id = $subject", Some(user_id)),
        };

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM request {filter} \
             ORDER BY created_at DESC"
        );
        let mut builder = self.db.query(&query);
        if let Some(subject) = subject {
            builder = builder.bind(("subject", subject));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<RequestRowWithId> = result.take(0).map_err(DbError::from)?;
        let requests = rows
            .into_iter()
            .map(|r| r.try_into_request())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    async fn apply_transition(&self, id: Uuid, change: StatusChange) -> VerdantResult<Request> {
        let id_str = id.to_string();

        let query = format!(
            "UPDATE type::record('request', $id) SET {} WHERE status = $from",
            transition_sets(&change)
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("from", change.from.as_str().to_string()))
            .bind(("to", change.to.as_str().to_string()));

        if let Some(price_quote) = quote_to_db(change.price_quote)? {
            builder = builder.bind(("price_quote", price_quote));
        }
        if let Some(auditor_id) = change.auditor_id {
            builder = builder.bind(("auditor_id", auditor_id));
        }
        if let Some(admin_comment) = change.admin_comment {
            builder = builder.bind(("admin_comment", admin_comment));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("request", &id_str, e.to_string()))?;

        let rows: Vec<RequestRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_request(id)?),
            None => Err(classify_missed_update(&self.db, id).await?.into()),
        }
    }
}
