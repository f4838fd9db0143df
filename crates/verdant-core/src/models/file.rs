//! File record domain model.
//!
//! Binary content lives in object storage; a file record only keeps the
//! metadata written after an upload succeeded. Records are append-only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VerdantError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    ProjectFile,
    Contract,
    AuditReport,
    Certificate,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::ProjectFile => "project_file",
            FileCategory::Contract => "contract",
            FileCategory::AuditReport => "audit_report",
            FileCategory::Certificate => "certificate",
            FileCategory::Other => "other",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = VerdantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_file" => Ok(FileCategory::ProjectFile),
            "contract" => Ok(FileCategory::Contract),
            "audit_report" => Ok(FileCategory::AuditReport),
            "certificate" => Ok(FileCategory::Certificate),
            "other" => Ok(FileCategory::Other),
            other => Err(VerdantError::validation(
                "category",
                format!("unknown file category: {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub request_id: Uuid,
    /// Uploader's subject id.
    pub user_id: String,
    pub url: String,
    pub name: String,
    pub category: FileCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileRecord {
    pub request_id: Uuid,
    pub user_id: String,
    pub url: String,
    pub name: String,
    pub category: FileCategory,
}

/// Metadata of an uploaded object, as reported by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewFile {
    pub name: String,
    pub url: String,
    pub category: FileCategory,
}
