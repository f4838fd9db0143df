//! Explicit caller context passed into every workflow call.

use serde::{Deserialize, Serialize};

use crate::models::profile::{Profile, Role};

/// Who is acting: the authenticated subject and the role their profile
/// grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&Profile> for Actor {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            role: profile.role,
        }
    }
}
