//! Audit subrecord domain model.
//!
//! At most one audit exists per request. It is created the first time the
//! assigned auditor submits findings and updated in place afterwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Check name -> passed.
pub type Checklist = BTreeMap<String, bool>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audit {
    pub id: Uuid,
    pub request_id: Uuid,
    pub auditor_id: String,
    pub checklist: Checklist,
    pub conclusion: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// What the auditor submits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AuditFindings {
    pub checklist: Checklist,
    pub conclusion: Option<String>,
}

/// Findings bound to the request and the auditor submitting them.
#[derive(Debug, Clone)]
pub struct AuditSubmission {
    pub request_id: Uuid,
    pub auditor_id: String,
    pub findings: AuditFindings,
}
