//! SurrealDB repository implementations.

mod audit;
mod file;
mod profile;
mod request;

pub use audit::SurrealAuditRepository;
pub use file::SurrealFileRepository;
pub use profile::SurrealProfileRepository;
pub use request::SurrealRequestRepository;
