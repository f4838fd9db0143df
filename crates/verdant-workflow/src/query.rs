//! Role-scoped request listing and detail views.
//!
//! Relations are loaded explicitly per call, never embedded in the
//! request, so a view is always assembled from current records.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;
use verdant_core::context::Actor;
use verdant_core::error::{VerdantError, VerdantResult};
use verdant_core::models::audit::Audit;
use verdant_core::models::file::{FileCategory, FileRecord};
use verdant_core::models::profile::{Profile, Role};
use verdant_core::models::request::{Request, RequestScope};
use verdant_core::repository::{
    AuditRepository, FileRepository, ProfileRepository, RequestRepository,
};
use verdant_core::workflow::{Action, allowed_actions, is_visible_to};

use crate::error::WorkflowError;

/// Display fields of a related profile.
#[derive(Debug, Clone, Serialize)]
pub struct PartySummary {
    pub user_id: String,
    pub organization_name: Option<String>,
    pub phone_number: Option<String>,
}

impl From<Profile> for PartySummary {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: profile.user_id,
            organization_name: profile.organization_name,
            phone_number: profile.phone_number,
        }
    }
}

/// One row of a request listing.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    #[serde(flatten)]
    pub request: Request,
    pub owner: Option<PartySummary>,
    pub auditor: Option<PartySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: Request,
    pub owner: Option<PartySummary>,
    pub auditor: Option<PartySummary>,
    /// Oldest first.
    pub files: Vec<FileRecord>,
    pub audit: Option<Audit>,
    /// Most recent certificate file, if one was issued.
    pub certificate: Option<FileRecord>,
    /// What the viewer may do next.
    pub allowed_actions: Vec<Action>,
}

/// Read side of the workflow.
pub struct RequestQueryService<R, F, A, P>
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
}

impl<R, F, A, P> RequestQueryService<R, F, A, P>
where
    R: RequestRepository,
    F: FileRepository,
    A: AuditRepository,
    P: ProfileRepository,
{
    pub fn new(requests: R, files: F, audits: A, profiles: P) -> Self {
        Self {
            requests,
            files,
            audits,
            profiles,
        }
    }

    /// Requests the viewer may see, newest first.
    pub async fn list_requests(&self, viewer: &Actor) -> VerdantResult<Vec<RequestSummary>> {
        let scope = match viewer.role {
            Role::Admin => RequestScope::All,
            Role::Owner => RequestScope::OwnedBy(viewer.user_id.clone()),
            Role::Auditor => RequestScope::AssignedTo(viewer.user_id.clone()),
        };
        let requests = self.requests.list(scope).await?;

        let mut parties: HashMap<String, Option<PartySummary>> = HashMap::new();
        let mut summaries = Vec::with_capacity(requests.len());
        for request in requests {
            let owner = self.party_cached(&mut parties, &request.user_id).await?;
            let auditor = match &request.auditor_id {
                Some(id) => self.party_cached(&mut parties, id).await?,
                None => None,
            };
            summaries.push(RequestSummary {
                request,
                owner,
                auditor,
            });
        }
        Ok(summaries)
    }

    pub async fn get_request_detail(
        &self,
        request_id: Uuid,
        viewer: &Actor,
    ) -> VerdantResult<RequestDetail> {
        let request = self.visible_request(request_id, viewer).await?;

        let owner = self.party(&request.user_id).await?;
        let auditor = match &request.auditor_id {
            Some(id) => self.party(id).await?,
            None => None,
        };
        let files = self.files.list_by_request(request.id).await?;
        let audit = self.audits.find_by_request_id(request.id).await?;
        let certificate = self
            .files
            .latest_by_category(request.id, FileCategory::Certificate)
            .await?;
        let allowed_actions = allowed_actions(&request, viewer);

        Ok(RequestDetail {
            request,
            owner,
            auditor,
            files,
            audit,
            certificate,
            allowed_actions,
        })
    }

    pub async fn list_files(
        &self,
        request_id: Uuid,
        viewer: &Actor,
    ) -> VerdantResult<Vec<FileRecord>> {
        let request = self.visible_request(request_id, viewer).await?;
        self.files.list_by_request(request.id).await
    }

    async fn visible_request(&self, request_id: Uuid, viewer: &Actor) -> VerdantResult<Request> {
        let request = self.requests.get_by_id(request_id).await?;
        if !is_visible_to(&request, viewer) {
            return Err(WorkflowError::NotVisible.into());
        }
        Ok(request)
    }

    /// A related profile, or `None` if that subject never set one up.
    async fn party(&self, user_id: &str) -> VerdantResult<Option<PartySummary>> {
        match self.profiles.get_by_user_id(user_id).await {
            Ok(profile) => Ok(Some(profile.into())),
            Err(VerdantError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn party_cached(
        &self,
        cache: &mut HashMap<String, Option<PartySummary>>,
        user_id: &str,
    ) -> VerdantResult<Option<PartySummary>> {
        if let Some(hit) = cache.get(user_id) {
            return Ok(hit.clone());
        }
        let party = self.party(user_id).await?;
        cache.insert(user_id.to_string(), party.clone());
        Ok(party)
    }
}
