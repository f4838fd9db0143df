//! Workflow engine configuration.

use serde::Deserialize;

/// Configuration for the workflow engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Require a recorded file of the matching category before the
    /// contract, project-upload and certificate edges (default: true).
    pub enforce_file_prerequisites: bool,
    /// Maximum audit conclusion length in characters (default: 10 000).
    pub max_conclusion_length: usize,
    /// Maximum number of checklist entries per audit (default: 64).
    pub max_checklist_items: usize,
    /// Maximum file name length in characters (default: 255).
    pub max_file_name_length: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enforce_file_prerequisites: true,
            max_conclusion_length: 10_000,
            max_checklist_items: 64,
            max_file_name_length: 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enforce_prerequisites() {
        let config = WorkflowConfig::default();
        assert!(config.enforce_file_prerequisites);
        assert_eq!(config.max_checklist_items, 64);
    }
}
