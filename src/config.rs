//! Production configuration system
//!
//! Provides centralized configuration management with:
//! - Config file loading (TOML)
//! - `$NAME` references expanded from the environment
//! - Environment variable overrides
//! - Runtime defaults
//! - Validation and type safety

use crate::collector::gcp::BillingExport;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider settings
    pub gcp: GcpConfig,

    /// Analysis and recommendation settings
    pub analysis: AnalysisConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Paths configuration
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    pub project_id: String,
    pub billing_account_id: String,
    /// `project.dataset.table` of the Cloud Billing export; billing collection is
    /// skipped (with a warning) when empty
    pub billing_export_table: String,
    /// Whether the export table is the resource-level (detailed) export
    pub resource_level_export: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub lookback_days: i64,
    pub anomaly_threshold_pct: f64,
    /// 0 means unlimited
    pub max_recommendations: usize,
    pub min_savings: f64,
    /// Days covered by the budget forecast
    pub forecast_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            anomaly_threshold_pct: 20.0,
            max_recommendations: 0,
            min_savings: 0.0,
            forecast_days: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl GcpConfig {
    pub fn billing_export(&self) -> Option<BillingExport> {
        if self.billing_export_table.trim().is_empty() {
            return None;
        }
        Some(BillingExport {
            table: self.billing_export_table.clone(),
            resource_level: self.resource_level_export,
        })
    }
}

impl Config {
    /// Candidate config files, first existing one wins
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("cloud-cost-optimizer.toml"),
            PathBuf::from(".cloud-cost-optimizer.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("cloud-cost-optimizer").join("config.toml"));
        }
        paths
    }

    /// Load configuration from an explicit file or the search paths, then environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::search_paths().into_iter().find(|p| p.exists()) {
                Some(path) => {
                    info!(config_file = %path.display(), "Loading configuration from file");
                    Self::load_from_file(&path)?
                }
                None => {
                    debug!("No configuration file found, using defaults");
                    Config::default()
                }
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file, expanding `$NAME` values
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.expand_env_references();
        Ok(config)
    }

    fn expand_env_references(&mut self) {
        for (key, value) in [
            ("gcp.project_id", &mut self.gcp.project_id),
            ("gcp.billing_account_id", &mut self.gcp.billing_account_id),
            ("gcp.billing_export_table", &mut self.gcp.billing_export_table),
        ] {
            if let Some(expanded) = expand_env_value(key, value) {
                *value = expanded;
            }
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Provider overrides
        if let Ok(val) = env::var("GCP_PROJECT_ID") {
            self.gcp.project_id = val;
        }
        if let Ok(val) = env::var("GCP_BILLING_ACCOUNT_ID") {
            self.gcp.billing_account_id = val;
        }
        if let Ok(val) = env::var("CCO_BILLING_EXPORT_TABLE") {
            self.gcp.billing_export_table = val;
        }

        // Analysis overrides
        if let Ok(val) = env::var("CCO_LOOKBACK_DAYS") {
            self.analysis.lookback_days = val.parse().context("Invalid CCO_LOOKBACK_DAYS")?;
        }

        // Path overrides
        if let Ok(val) = env::var("CCO_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.analysis.lookback_days <= 0 {
            return Err(anyhow::anyhow!(
                "Lookback days must be greater than 0, got {}",
                self.analysis.lookback_days
            ));
        }

        if self.analysis.anomaly_threshold_pct < 0.0 {
            return Err(anyhow::anyhow!("Anomaly threshold cannot be negative"));
        }

        if self.analysis.min_savings < 0.0 {
            return Err(anyhow::anyhow!("Minimum savings cannot be negative"));
        }

        if self.analysis.forecast_days == 0 {
            return Err(anyhow::anyhow!("Forecast days must be greater than 0"));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(anyhow::anyhow!(
                "Unknown logging format '{}', expected pretty or json",
                self.logging.format
            ));
        }

        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            return Err(anyhow::anyhow!(
                "Unknown logging output '{}', expected console, file or both",
                self.logging.output
            ));
        }

        if self.gcp.project_id.trim().is_empty() {
            warn!("No GCP project configured, authentication will fail");
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

/// Expand a `$NAME` value. Unset variables leave the value untouched.
fn expand_env_value(key: &str, value: &str) -> Option<String> {
    let name = value.strip_prefix('$')?;
    match env::var(name) {
        Ok(expanded) if !expanded.is_empty() => {
            debug!(key, variable = name, "Expanded configuration value from environment");
            Some(expanded)
        }
        _ => {
            warn!(key, variable = name, "Environment variable not found for configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "INFO");
        assert_eq!(config.analysis.lookback_days, 30);
        assert_eq!(config.analysis.anomaly_threshold_pct, 20.0);
        assert!(config.gcp.billing_export().is_none());
    }

    #[test]
    fn test_env_value_expansion() {
        env::set_var("CCO_TEST_EXPANDED_PROJECT", "from-env");
        assert_eq!(
            expand_env_value("gcp.project_id", "$CCO_TEST_EXPANDED_PROJECT").as_deref(),
            Some("from-env")
        );
        env::remove_var("CCO_TEST_EXPANDED_PROJECT");

        assert_eq!(expand_env_value("gcp.project_id", "$CCO_TEST_NEVER_SET"), None);
        assert_eq!(expand_env_value("gcp.project_id", "literal"), None);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.analysis.lookback_days = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
