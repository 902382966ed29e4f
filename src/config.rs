//! TOML configuration
//!
//! Every section and key is optional; a missing file section falls back to
//! the defaults below. Command-line flags are applied on top by the binary.
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:8000"
//! timeout_secs = 30
//!
//! [dashboard]
//! metric_type = "timetofirsttoken"
//! streaming = true
//! default_range = "three-month"
//! log_scale = false
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! file = "latencia.log"
//!
//! [palette]
//! MyProvider = "#123456"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::TimeRange;
use crate::client::DEFAULT_TIMEOUT_SECS;
use crate::error::{LatenciaError, Result};
use crate::orchestrator::PipelineConfig;
use crate::palette::{Palette, Rgb};

/// Default backend root
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Metrics backend
    pub backend: BackendConfig,
    /// Pipeline defaults
    pub dashboard: DashboardConfig,
    /// Log output
    pub logging: LoggingConfig,
    /// Provider color overrides
    pub palette: BTreeMap<String, Rgb>,
}

/// `[backend]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Root URL of the metrics API
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[dashboard]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Metric key sent as `metricType`
    pub metric_type: String,
    /// Streaming or end-to-end measurements
    pub streaming: bool,
    /// Range fetched on mount
    pub default_range: TimeRange,
    /// Plot aggregates on a log10 axis
    pub log_scale: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            metric_type: "timetofirsttoken".to_string(),
            streaming: true,
            default_range: TimeRange::default(),
            log_scale: false,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Write logs here instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format
    Json,
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns `IoError` if the file cannot be read and `InvalidConfiguration`
    /// if it does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LatenciaError::IoError {
            message: format!("Failed to read config file {}: {e}", path.display()),
        })?;
        Self::parse_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` on malformed TOML, unknown enum values
    /// or bad colors.
    pub fn parse_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| LatenciaError::InvalidConfiguration(format!("Failed to parse config: {e}")))
    }

    /// Check values that parse but cannot work
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(LatenciaError::InvalidConfiguration(
                "backend.base_url cannot be empty".to_string(),
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(LatenciaError::InvalidConfiguration(
                "backend.timeout_secs cannot be 0".to_string(),
            ));
        }
        if self.dashboard.metric_type.trim().is_empty() {
            return Err(LatenciaError::InvalidConfiguration(
                "dashboard.metric_type cannot be empty".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(LatenciaError::InvalidConfiguration(
                "logging.level cannot be empty".to_string(),
            ));
        }
        if let Some(name) = self.palette.keys().find(|k| k.trim().is_empty()) {
            return Err(LatenciaError::InvalidConfiguration(format!(
                "palette entry {name:?} has no provider name"
            )));
        }
        Ok(())
    }

    /// Orchestrator settings derived from `[dashboard]` and `[palette]`
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            metric_type: self.dashboard.metric_type.clone(),
            streaming: self.dashboard.streaming,
            default_range: self.dashboard.default_range,
            log_scale: self.dashboard.log_scale,
            palette: Palette::with_overrides(&self.palette),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.dashboard.metric_type, "timetofirsttoken");
        assert!(config.dashboard.streaming);
        assert_eq!(config.dashboard.default_range, TimeRange::ThreeMonth);
        assert!(!config.dashboard.log_scale);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
[dashboard]
metric_type = "response_times"
default_range = "week"
"#;
        let config = AppConfig::parse_str(toml).expect("parse");
        assert_eq!(config.dashboard.metric_type, "response_times");
        assert_eq!(config.dashboard.default_range, TimeRange::Week);
        assert!(config.dashboard.streaming);
        assert_eq!(config.backend.timeout_secs, 30);
    }

    #[test]
    fn test_full_config() {
        let toml = r##"
[backend]
base_url = "http://metrics.internal:9000"
timeout_secs = 5

[dashboard]
streaming = false
log_scale = true

[logging]
level = "debug"
format = "json"
file = "/tmp/latencia.log"

[palette]
OpenAI = "#000000"
Mistral = "#FA520F"
"##;
        let config = AppConfig::parse_str(toml).expect("parse");
        assert_eq!(config.backend.base_url, "http://metrics.internal:9000");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/latencia.log")));

        let pipeline = config.pipeline_config();
        assert!(!pipeline.streaming);
        assert!(pipeline.log_scale);
        assert_eq!(pipeline.palette.color_for("OpenAI"), Rgb::new(0, 0, 0));
        assert_eq!(pipeline.palette.color_for("Mistral"), Rgb::new(0xFA, 0x52, 0x0F));
        assert!(pipeline.palette.knows("Groq"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(AppConfig::parse_str("[dashboard]\ndefault_range = \"year\"").is_err());
        assert!(AppConfig::parse_str("[palette]\nOpenAI = \"green\"").is_err());

        let mut config = AppConfig::default();
        config.backend.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(LatenciaError::InvalidConfiguration(msg)) if msg.contains("timeout_secs")
        ));

        let mut config = AppConfig::default();
        config.dashboard.metric_type = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[backend]\nbase_url = \"http://10.0.0.1:8000\"").expect("write");

        let config = AppConfig::from_file(file.path()).expect("load");
        assert_eq!(config.backend.base_url, "http://10.0.0.1:8000");

        let missing = AppConfig::from_file(Path::new("/nonexistent/latencia.toml"));
        assert!(matches!(missing, Err(LatenciaError::IoError { .. })));
    }
}
