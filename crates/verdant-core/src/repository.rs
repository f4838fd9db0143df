//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Status changes go through
//! guarded operations that only apply when the stored status still
//! matches the expected source, so a lost race surfaces as
//! [`VerdantError::Conflict`](crate::error::VerdantError::Conflict)
//! instead of silently overwriting.

use uuid::Uuid;

use crate::error::VerdantResult;
use crate::models::{
    audit::{Audit, AuditSubmission},
    file::{CreateFileRecord, FileCategory, FileRecord},
    profile::{CreateProfile, Profile, Role, UpdateProfile},
    request::{CreateRequest, Request, RequestScope, StatusChange},
};

pub trait ProfileRepository: Send + Sync {
    /// Fails with `AlreadyExists` if the subject already has a profile.
    fn create(&self, input: CreateProfile) -> impl Future<Output = VerdantResult<Profile>> + Send;
    fn get_by_user_id(&self, user_id: &str) -> impl Future<Output = VerdantResult<Profile>> + Send;
    fn update(
        &self,
        user_id: &str,
        input: UpdateProfile,
    ) -> impl Future<Output = VerdantResult<Profile>> + Send;
    fn list_by_role(&self, role: Role) -> impl Future<Output = VerdantResult<Vec<Profile>>> + Send;
}

pub trait RequestRepository: Send + Sync {
    /// Creates the request in `submitted` with no quote and no auditor.
    fn create(&self, input: CreateRequest) -> impl Future<Output = VerdantResult<Request>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = VerdantResult<Request>> + Send;
    /// Newest first.
    fn list(&self, scope: RequestScope) -> impl Future<Output = VerdantResult<Vec<Request>>> + Send;

    /// Atomically apply `change` if the stored status equals
    /// `change.from`. Zero rows affected is a `Conflict`.
    fn apply_transition(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> impl Future<Output = VerdantResult<Request>> + Send;
}

pub trait FileRepository: Send + Sync {
    fn create(
        &self,
        input: CreateFileRecord,
    ) -> impl Future<Output = VerdantResult<FileRecord>> + Send;
    /// Oldest first.
    fn list_by_request(
        &self,
        request_id: Uuid,
    ) -> impl Future<Output = VerdantResult<Vec<FileRecord>>> + Send;
    fn count_by_category(
        &self,
        request_id: Uuid,
        category: FileCategory,
    ) -> impl Future<Output = VerdantResult<u64>> + Send;
    /// Most recently recorded file of `category`, if any.
    fn latest_by_category(
        &self,
        request_id: Uuid,
        category: FileCategory,
    ) -> impl Future<Output = VerdantResult<Option<FileRecord>>> + Send;
}

pub trait AuditRepository: Send + Sync {
    fn find_by_request_id(
        &self,
        request_id: Uuid,
    ) -> impl Future<Output = VerdantResult<Option<Audit>>> + Send;

    /// Create or update the request's audit and apply `change` in a single
    /// transaction. If the guarded status update matches nothing, neither
    /// write persists and the call fails with `Conflict`.
    fn submit_with_transition(
        &self,
        submission: AuditSubmission,
        change: StatusChange,
    ) -> impl Future<Output = VerdantResult<(Audit, Request)>> + Send;
}
