//! Core types for risk engine

use crate::config::LevelThresholds;
use chrono::{DateTime, Utc};
use ledger_core::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite fraud score in [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(f64);

impl RiskScore {
    /// Create new risk score, clamped to [0.0, 1.0]; NaN becomes 0.0
    pub fn new(score: f64) -> Self {
        if score.is_nan() {
            return Self(0.0);
        }
        Self(score.clamp(0.0, 1.0))
    }

    /// Get raw score
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Scored behaviour dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    /// Transactions per trailing hour
    Velocity,
    /// Round, just-under-threshold or repeated amounts
    AmountPatterns,
    /// Time of day / day of week
    Timing,
}

impl RiskFactor {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactor::Velocity => "velocity",
            RiskFactor::AmountPatterns => "amount_patterns",
            RiskFactor::Timing => "timing",
        }
    }
}

/// Sub-score for one factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFactorScore {
    /// Which factor
    pub factor: RiskFactor,
    /// Sub-score in [0.0, 1.0]
    pub score: f64,
}

/// Flag raised when a single factor crosses its own threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudFlag {
    /// Velocity sub-score above threshold
    HighVelocity,
    /// Amount pattern sub-score above threshold
    SuspiciousAmounts,
    /// Timing sub-score above threshold
    UnusualTiming,
}

impl FraudFlag {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudFlag::HighVelocity => "high_velocity",
            FraudFlag::SuspiciousAmounts => "suspicious_amounts",
            FraudFlag::UnusualTiming => "unusual_timing",
        }
    }
}

impl fmt::Display for FraudFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk level, least severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Minimal risk
    Minimal,
    /// Low risk
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
}

impl RiskLevel {
    /// Bucket a composite score; thresholds are exclusive lower bounds
    pub fn from_score(score: RiskScore, thresholds: &LevelThresholds) -> Self {
        let s = score.value();
        if s > thresholds.high {
            RiskLevel::High
        } else if s > thresholds.medium {
            RiskLevel::Medium
        } else if s > thresholds.low {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "minimal",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommended action, least severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Let it through
    Approve,
    /// Let it through and watch
    Monitor,
    /// Hold for an analyst
    ManualReview,
    /// Reject
    BlockTransaction,
}

impl From<RiskLevel> for Recommendation {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::High => Recommendation::BlockTransaction,
            RiskLevel::Medium => Recommendation::ManualReview,
            RiskLevel::Low => Recommendation::Monitor,
            RiskLevel::Minimal => Recommendation::Approve,
        }
    }
}

impl Recommendation {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Approve => "approve",
            Recommendation::Monitor => "monitor",
            Recommendation::ManualReview => "manual_review",
            Recommendation::BlockTransaction => "block_transaction",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// History aggregates the scorer needs, fetched ahead of scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryAggregates {
    /// Completed transactions in the velocity window
    pub recent_count: u64,
    /// Completed transactions with the candidate's exact amount in the repeat window
    pub same_amount_count: u64,
}

/// Fraud assessment result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    /// User being assessed
    pub user_id: UserId,

    /// Candidate amount
    pub amount: Decimal,

    /// Evaluation instant (UTC)
    pub evaluated_at: DateTime<Utc>,

    /// Composite score
    pub score: RiskScore,

    /// Sub-scores: velocity, amount patterns, timing
    pub factors: Vec<RiskFactorScore>,

    /// Triggered flags, in factor order
    pub flags: Vec<FraudFlag>,

    /// Risk level
    pub risk_level: RiskLevel,

    /// Recommended action
    pub recommendation: Recommendation,
}

impl FraudAssessment {
    /// Sub-score for a factor
    pub fn factor_score(&self, factor: RiskFactor) -> Option<f64> {
        self.factors
            .iter()
            .find(|f| f.factor == factor)
            .map(|f| f.score)
    }

    /// Whether a flag was raised
    pub fn has_flag(&self, flag: FraudFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Medium and high outcomes go to the alert sink
    pub fn requires_alert(&self) -> bool {
        self.risk_level >= RiskLevel::Medium
    }
}
