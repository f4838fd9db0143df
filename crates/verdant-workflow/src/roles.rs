//! Role resolution: maps an authenticated subject to its profile.
//!
//! Every role-gated call starts here. A subject without a profile gets
//! [`VerdantError::ProfileNotSetUp`], which is distinct from "not
//! authenticated" and drives the client into profile setup.

use tracing::info;
use verdant_core::context::Actor;
use verdant_core::error::{VerdantError, VerdantResult};
use verdant_core::models::profile::{CreateProfile, Profile, Role, UpdateProfile};
use verdant_core::repository::ProfileRepository;

/// Generic over the profile repository so this layer has no dependency
/// on the database crate.
#[derive(Clone)]
pub struct RoleResolver<P: ProfileRepository> {
    profiles: P,
}

impl<P: ProfileRepository> RoleResolver<P> {
    pub fn new(profiles: P) -> Self {
        Self { profiles }
    }

    /// First-time setup. The role chosen here is permanent.
    pub async fn setup_profile(&self, input: CreateProfile) -> VerdantResult<Profile> {
        if input.user_id.trim().is_empty() {
            return Err(VerdantError::validation("user_id", "must not be empty"));
        }

        let profile = self.profiles.create(input).await?;
        info!(
            user_id = %profile.user_id,
            role = %profile.role,
            "Profile set up"
        );
        Ok(profile)
    }

    pub async fn current_profile(&self, user_id: &str) -> VerdantResult<Profile> {
        match self.profiles.get_by_user_id(user_id).await {
            Ok(profile) => Ok(profile),
            Err(VerdantError::NotFound { .. }) => Err(VerdantError::ProfileNotSetUp {
                user_id: user_id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Edits contact details. There is no way to change the role.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfile,
    ) -> VerdantResult<Profile> {
        self.current_profile(user_id).await?;
        let profile = self.profiles.update(user_id, input).await?;
        info!(user_id = %profile.user_id, "Profile updated");
        Ok(profile)
    }

    /// The `{user_id, role}` context every workflow call takes.
    pub async fn actor(&self, user_id: &str) -> VerdantResult<Actor> {
        let profile = self.current_profile(user_id).await?;
        Ok(Actor::from(&profile))
    }

    pub async fn list_auditors(&self) -> VerdantResult<Vec<Profile>> {
        self.profiles.list_by_role(Role::Auditor).await
    }
}
