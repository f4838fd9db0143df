//! Verdant Core: domain models, errors, repository traits and the
//! certification request transition table.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;
pub mod workflow;

pub use context::Actor;
pub use error::{VerdantError, VerdantResult};
