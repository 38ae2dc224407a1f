use crate::error::{ComplianceError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// AML screening thresholds and windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmlConfig {
    /// Amounts above this raise `high_value_transaction`
    pub high_value_threshold: Decimal,

    /// Multiples of this raise `round_amount`
    pub round_unit: Decimal,

    /// Trailing window for identical amounts (days)
    pub repeat_window_days: i64,

    /// At least this many identical amounts raise `repeated_amounts`
    pub repeat_min_count: u64,

    /// Trailing velocity window (minutes)
    pub velocity_window_minutes: i64,

    /// More transfers than this raise `high_velocity`
    pub velocity_max_count: u64,

    /// Trailing volume window (hours)
    pub daily_window_hours: i64,

    /// A larger volume than this raises `high_daily_volume`
    pub daily_volume_threshold: Decimal,

    /// Title keywords for the PEP check
    pub pep_keywords: Vec<String>,

    /// Extra sanctions lists (`id,name` CSV files)
    pub sanctions_lists: Vec<PathBuf>,

    /// Bound on each history lookup
    pub history_timeout_ms: u64,
}

impl Default for AmlConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: Decimal::from(10_000),
            round_unit: Decimal::from(1_000),
            repeat_window_days: 7,
            repeat_min_count: 3,
            velocity_window_minutes: 60,
            velocity_max_count: 5,
            daily_window_hours: 24,
            daily_volume_threshold: Decimal::from(10_000),
            pep_keywords: vec![
                "governor".to_string(),
                "mayor".to_string(),
                "senator".to_string(),
            ],
            sanctions_lists: Vec::new(),
            history_timeout_ms: 2_000,
        }
    }
}

impl AmlConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ComplianceError::ConfigError(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AmlConfig = toml::from_str(content)
            .map_err(|e| ComplianceError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `AML_HISTORY_TIMEOUT_MS` and `AML_SANCTIONS_LISTS`
    /// (comma-separated paths) overrides
    pub fn from_env() -> Result<Self> {
        let mut config = AmlConfig::default();

        if let Ok(timeout) = std::env::var("AML_HISTORY_TIMEOUT_MS") {
            config.history_timeout_ms = timeout.parse().map_err(|e| {
                ComplianceError::ConfigError(format!("AML_HISTORY_TIMEOUT_MS: {}", e))
            })?;
        }

        if let Ok(lists) = std::env::var("AML_SANCTIONS_LISTS") {
            config.sanctions_lists = lists
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.round_unit <= Decimal::ZERO {
            return Err(ComplianceError::ConfigError(
                "round_unit must be positive".to_string(),
            ));
        }
        if self.high_value_threshold < Decimal::ZERO || self.daily_volume_threshold < Decimal::ZERO {
            return Err(ComplianceError::ConfigError(
                "Amount thresholds must be non-negative".to_string(),
            ));
        }
        if self.repeat_window_days <= 0
            || self.velocity_window_minutes <= 0
            || self.daily_window_hours <= 0
        {
            return Err(ComplianceError::ConfigError(
                "Lookback windows must be positive".to_string(),
            ));
        }
        if self.history_timeout_ms == 0 {
            return Err(ComplianceError::ConfigError(
                "history_timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
