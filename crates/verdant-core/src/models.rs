//! Domain models for Verdant.
//!
//! Request, Profile, FileRecord and Audit are separate aggregates linked by
//! id; relations are loaded explicitly rather than embedded.

pub mod audit;
pub mod file;
pub mod profile;
pub mod request;
