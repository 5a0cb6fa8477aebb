// Logger configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Default filter directives when `RUST_LOG` is not set
    pub default_filter: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
    /// Include file/line information in human-readable output
    pub with_source: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: false,
            with_source: false,
        }
    }
}

impl LoggerConfig {
    /// Development profile: readable output with source locations
    pub fn development(default_filter: impl Into<String>) -> Self {
        Self {
            default_filter: default_filter.into(),
            json: false,
            with_source: true,
        }
    }

    /// Production profile: structured JSON output
    pub fn production(default_filter: impl Into<String>) -> Self {
        Self {
            default_filter: default_filter.into(),
            json: true,
            with_source: false,
        }
    }
}
