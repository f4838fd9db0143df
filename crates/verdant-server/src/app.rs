//! Service wiring over a SurrealDB connection.

use surrealdb::{Connection, Surreal};
use verdant_db::repository::{
    SurrealAuditRepository, SurrealFileRepository, SurrealProfileRepository,
    SurrealRequestRepository,
};
use verdant_workflow::{RequestQueryService, RoleResolver, WorkflowConfig, WorkflowService};

pub type Workflow<C> = WorkflowService<
    SurrealRequestRepository<C>,
    SurrealFileRepository<C>,
    SurrealAuditRepository<C>,
    SurrealProfileRepository<C>,
>;

pub type Queries<C> = RequestQueryService<
    SurrealRequestRepository<C>,
    SurrealFileRepository<C>,
    SurrealAuditRepository<C>,
    SurrealProfileRepository<C>,
>;

/// The services a transport layer binds to.
pub struct App<C: Connection> {
    pub roles: RoleResolver<SurrealProfileRepository<C>>,
    pub workflow: Workflow<C>,
    pub queries: Queries<C>,
}

impl<C: Connection> App<C> {
    pub fn new(db: Surreal<C>, config: WorkflowConfig) -> Self {
        Self {
            roles: RoleResolver::new(SurrealProfileRepository::new(db.clone())),
            workflow: WorkflowService::new(
                SurrealRequestRepository::new(db.clone()),
                SurrealFileRepository::new(db.clone()),
                SurrealAuditRepository::new(db.clone()),
                SurrealProfileRepository::new(db.clone()),
                config,
            ),
            queries: RequestQueryService::new(
                SurrealRequestRepository::new(db.clone()),
                SurrealFileRepository::new(db.clone()),
                SurrealAuditRepository::new(db.clone()),
                SurrealProfileRepository::new(db),
            ),
        }
    }
}
