//! Scoring configuration
//!
//! Weights and thresholds are fixed per deployment: the engine takes an
//! immutable [`RiskConfig`] at construction and never changes it.
//!
//! Decimal fields are written as strings in TOML (`round_unit = "1000"`).

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Sum of the default factor weights.
///
/// The weights are not normalised to 1.0, so the composite score tops out at
/// 0.65 and the default `high` bucket (> 0.8) cannot be reached. This is kept
/// as-is until product decides otherwise; see `weights_are_not_normalised`.
pub const UNNORMALIZED_WEIGHT_SUM: f64 = 0.65;

/// Complete risk engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Factor weights in the composite score
    pub weights: RiskWeights,

    /// Velocity breakpoints
    pub velocity: VelocityRules,

    /// Amount pattern rules
    pub amount_patterns: AmountPatternRules,

    /// Timing rules
    pub timing: TimingRules,

    /// Per-factor flag thresholds
    pub flags: FlagThresholds,

    /// Risk level buckets
    pub levels: LevelThresholds,

    /// Rapid-transfer scan rules
    pub rapid_transfer: RapidTransferRules,

    /// Upper bound on each history lookup (milliseconds)
    pub history_timeout_ms: u64,

    /// Fail with `UnknownUser` when the store does not know the user
    pub require_known_user: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            velocity: VelocityRules::default(),
            amount_patterns: AmountPatternRules::default(),
            timing: TimingRules::default(),
            flags: FlagThresholds::default(),
            levels: LevelThresholds::default(),
            rapid_transfer: RapidTransferRules::default(),
            history_timeout_ms: 2_000,
            require_known_user: false,
        }
    }
}

/// Composite score weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    /// Velocity weight
    pub velocity: f64,
    /// Amount pattern weight
    pub amount_patterns: f64,
    /// Timing weight
    pub timing: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            velocity: 0.3,
            amount_patterns: 0.25,
            timing: 0.1,
        }
    }
}

impl RiskWeights {
    /// Sum of all weights
    pub fn total(&self) -> f64 {
        self.velocity + self.amount_patterns + self.timing
    }
}

/// One velocity step: more than `above` transactions scores `score`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityBreakpoint {
    /// Exclusive lower bound on the transaction count
    pub above: u64,
    /// Sub-score when the count exceeds `above`
    pub score: f64,
}

/// Velocity scoring rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityRules {
    /// Trailing window (minutes)
    pub window_minutes: i64,

    /// Breakpoints, highest `above` first
    pub breakpoints: Vec<VelocityBreakpoint>,

    /// Score when no breakpoint is exceeded
    pub baseline: f64,
}

impl Default for VelocityRules {
    fn default() -> Self {
        Self {
            window_minutes: 60,
            breakpoints: vec![
                VelocityBreakpoint { above: 10, score: 1.0 },
                VelocityBreakpoint { above: 5, score: 0.7 },
                VelocityBreakpoint { above: 3, score: 0.4 },
            ],
            baseline: 0.1,
        }
    }
}

/// Amount pattern scoring rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountPatternRules {
    /// Amounts divisible by this are "round"
    pub round_unit: Decimal,

    /// Bonus for a round amount
    pub round_bonus: f64,

    /// Lower bound of the just-under-threshold band (inclusive)
    pub structuring_min: Decimal,

    /// Upper bound of the just-under-threshold band (inclusive)
    pub structuring_max: Decimal,

    /// Bonus for an amount inside the band; stacks with `round_bonus`
    pub structuring_bonus: f64,

    /// Lookback for repeated amounts (days)
    pub repeat_window_days: i64,

    /// Minimum prior identical amounts to trigger the bonus
    pub repeat_min_count: u64,

    /// Bonus for repeated amounts
    pub repeat_bonus: f64,
}

impl Default for AmountPatternRules {
    fn default() -> Self {
        Self {
            round_unit: Decimal::from(1_000),
            round_bonus: 0.3,
            structuring_min: Decimal::from(9_500),
            structuring_max: Decimal::from(9_999),
            structuring_bonus: 0.8,
            repeat_window_days: 7,
            repeat_min_count: 3,
            repeat_bonus: 0.5,
        }
    }
}

/// Timing scoring rules (UTC)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingRules {
    /// Hours strictly before this are late night
    pub night_before_hour: u32,

    /// Hours strictly after this are late night
    pub night_after_hour: u32,

    /// Late-night score
    pub night_score: f64,

    /// Saturday/Sunday score
    pub weekend_score: f64,

    /// Score otherwise
    pub baseline: f64,
}

impl Default for TimingRules {
    fn default() -> Self {
        Self {
            night_before_hour: 6,
            // hour() never exceeds 23, so only the morning side fires by default
            night_after_hour: 23,
            night_score: 0.6,
            weekend_score: 0.3,
            baseline: 0.1,
        }
    }
}

/// Sub-score thresholds above which a factor is flagged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagThresholds {
    /// Velocity flag threshold
    pub velocity: f64,
    /// Amount pattern flag threshold
    pub amount_patterns: f64,
    /// Timing flag threshold
    pub timing: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            velocity: 0.7,
            amount_patterns: 0.6,
            timing: 0.5,
        }
    }
}

/// Composite score thresholds (exclusive lower bounds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    /// Above this is high
    pub high: f64,
    /// Above this is medium
    pub medium: f64,
    /// Above this is low
    pub low: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
            low: 0.3,
        }
    }
}

/// Admin rapid-transfer scan rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RapidTransferRules {
    /// Trailing window (minutes)
    pub window_minutes: i64,

    /// More transfers than this is suspicious
    pub max_count: u64,

    /// A larger total than this is suspicious (and high severity)
    pub max_total: Decimal,
}

impl Default for RapidTransferRules {
    fn default() -> Self {
        Self {
            window_minutes: 10,
            max_count: 5,
            max_total: Decimal::from(5_000),
        }
    }
}

impl RiskConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::InvalidConfig(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RiskConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = RiskConfig::default();

        if let Ok(timeout) = std::env::var("RISK_HISTORY_TIMEOUT_MS") {
            config.history_timeout_ms = timeout
                .parse()
                .map_err(|e| Error::InvalidConfig(format!("RISK_HISTORY_TIMEOUT_MS: {}", e)))?;
        }

        if let Ok(flag) = std::env::var("RISK_REQUIRE_KNOWN_USER") {
            config.require_known_user = flag
                .parse()
                .map_err(|e| Error::InvalidConfig(format!("RISK_REQUIRE_KNOWN_USER: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// History lookup bound
    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }

    /// Reject configurations that would break monotonic bucketing
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        for (name, weight) in [
            ("velocity", w.velocity),
            ("amount_patterns", w.amount_patterns),
            ("timing", w.timing),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "Weight {} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }

        let l = &self.levels;
        if !(unit(l.low) && unit(l.medium) && unit(l.high) && l.low < l.medium && l.medium < l.high)
        {
            return Err(Error::InvalidConfig(format!(
                "Level thresholds must satisfy 0 <= low < medium < high <= 1, got {}/{}/{}",
                l.low, l.medium, l.high
            )));
        }

        let v = &self.velocity;
        if v.window_minutes <= 0 {
            return Err(Error::InvalidConfig("Velocity window must be positive".to_string()));
        }
        let descending = v
            .breakpoints
            .windows(2)
            .all(|pair| pair[0].above > pair[1].above && pair[0].score >= pair[1].score);
        let floor_ok = v.breakpoints.last().map_or(true, |b| b.score >= v.baseline);
        if !descending || !floor_ok || !v.breakpoints.iter().all(|b| unit(b.score)) || !unit(v.baseline)
        {
            return Err(Error::InvalidConfig(
                "Velocity breakpoints must be ordered by descending count and score".to_string(),
            ));
        }

        let a = &self.amount_patterns;
        if a.round_unit <= Decimal::ZERO {
            return Err(Error::InvalidConfig("round_unit must be positive".to_string()));
        }
        if a.structuring_min > a.structuring_max {
            return Err(Error::InvalidConfig(
                "structuring_min must not exceed structuring_max".to_string(),
            ));
        }
        if a.repeat_window_days <= 0 {
            return Err(Error::InvalidConfig("Repeat window must be positive".to_string()));
        }
        if ![a.round_bonus, a.structuring_bonus, a.repeat_bonus]
            .iter()
            .all(|b| unit(*b))
        {
            return Err(Error::InvalidConfig("Amount bonuses must be within [0, 1]".to_string()));
        }

        let t = &self.timing;
        if ![t.night_score, t.weekend_score, t.baseline].iter().all(|s| unit(*s)) {
            return Err(Error::InvalidConfig("Timing scores must be within [0, 1]".to_string()));
        }

        if self.rapid_transfer.window_minutes <= 0 {
            return Err(Error::InvalidConfig("Scan window must be positive".to_string()));
        }

        if self.history_timeout_ms == 0 {
            return Err(Error::InvalidConfig("history_timeout_ms must be non-zero".to_string()));
        }

        Ok(())
    }
}

fn unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
