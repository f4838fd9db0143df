//! Verdant Workflow: the certification request state machine, audit
//! submission, role resolution and role-scoped queries.

pub mod config;
pub mod error;
pub mod query;
pub mod roles;
pub mod service;

pub use config::WorkflowConfig;
pub use error::WorkflowError;
pub use query::{PartySummary, RequestDetail, RequestQueryService, RequestSummary};
pub use roles::RoleResolver;
pub use service::{TransitionInput, WorkflowService};
