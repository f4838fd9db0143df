//! Verdant Server: configuration loading, logging setup and service
//! wiring for the certification workflow.

pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::ServerConfig;
pub use error::ServerError;
