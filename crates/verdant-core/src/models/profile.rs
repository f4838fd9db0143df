//! Profile domain model.
//!
//! A profile binds an identity-provider subject to exactly one workflow
//! role. It is created once, on first login, and the role never changes
//! afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VerdantError;

/// The party a profile acts as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Legal entity that creates and owns certification requests.
    Owner,
    /// Platform administrator: quotes, contracts, assignment, approval.
    Admin,
    /// Evaluates assigned requests through a checklist and conclusion.
    Auditor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Auditor => "auditor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = VerdantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "auditor" => Ok(Role::Auditor),
            other => Err(VerdantError::validation(
                "role",
                format!("unknown role: {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Subject id issued by the identity provider. Unique.
    pub user_id: String,
    pub role: Role,
    pub organization_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub user_id: String,
    pub role: Role,
    pub organization_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Contact fields a user may edit after setup. The role is deliberately
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfile {
    pub organization_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Owner, Role::Admin, Role::Auditor] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_a_validation_error() {
        let err = "legal_entity".parse::<Role>().unwrap_err();
        assert!(matches!(err, VerdantError::Validation { ref field, .. } if field == "role"));
    }

    #[test]
    fn update_profile_rejects_role_field() {
        let json = r#"{"organization_name":"Acme","role":"admin"}"#;
        assert!(serde_json::from_str::<UpdateProfile>(json).is_err());
    }
}
