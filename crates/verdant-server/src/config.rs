//! Server configuration.

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;
use verdant_db::DbConfig;
use verdant_workflow::WorkflowConfig;

use crate::error::ServerError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub database: DbConfig,
    pub workflow: WorkflowConfig,
    /// Default tracing directive; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database: DbConfig::default(),
            workflow: WorkflowConfig::default(),
            log_level: "verdant=info".into(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `verdant.toml` in the working directory, if present
    /// 3. Environment variables prefixed `VERDANT_`, nested with `__`
    ///    (e.g. `VERDANT_DATABASE__URL`)
    pub fn load() -> Result<Self, ServerError> {
        let mut builder = Config::builder();

        if Path::new("verdant.toml").exists() {
            builder = builder.add_source(File::with_name("verdant"));
        }

        builder = builder.add_source(
            Environment::with_prefix("VERDANT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load `.env` if it exists. Must run before [`ServerConfig::load`].
    pub fn load_env_file() -> Result<bool, ServerError> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sources_yield_defaults() {
        let config: ServerConfig = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.database.namespace, "verdant");
        assert!(config.workflow.enforce_file_prerequisites);
        assert_eq!(config.log_level, "verdant=info");
    }

    #[test]
    fn nested_values_override_defaults() {
        let config: ServerConfig = Config::builder()
            .set_override("workflow.enforce_file_prerequisites", false)
            .unwrap()
            .set_override("database.url", "db.internal:8000")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(!config.workflow.enforce_file_prerequisites);
        assert_eq!(config.workflow.max_checklist_items, 64);
        assert_eq!(config.database.url, "db.internal:8000");
    }
}
