use chrono::{DateTime, Utc};
use ledger_core::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subject of a screening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub ssn_last_4: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            full_name: full_name.into(),
            phone: None,
            ssn_last_4: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmlFlag {
    SanctionsMatch,
    PepMatch,
    HighValueTransaction,
    RoundAmount,
    RepeatedAmounts,
    HighVelocity,
    HighDailyVolume,
}

impl AmlFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmlFlag::SanctionsMatch => "sanctions_match",
            AmlFlag::PepMatch => "pep_match",
            AmlFlag::HighValueTransaction => "high_value_transaction",
            AmlFlag::RoundAmount => "round_amount",
            AmlFlag::RepeatedAmounts => "repeated_amounts",
            AmlFlag::HighVelocity => "high_velocity",
            AmlFlag::HighDailyVolume => "high_daily_volume",
        }
    }
}

impl fmt::Display for AmlFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single list check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Clear,
    Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmlStatus {
    Clear,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmlRiskLevel {
    Low,
    Medium,
    High,
}

impl AmlRiskLevel {
    /// Bucket by number of raised flags
    ///
    /// Only the count matters: a lone sanctions or PEP hit stays `Low`.
    /// Blocking is carried by [`AmlStatus`], not by the risk level.
    pub fn from_flag_count(count: usize) -> Self {
        if count > 3 {
            AmlRiskLevel::High
        } else if count > 1 {
            AmlRiskLevel::Medium
        } else {
            AmlRiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningType {
    Transaction,
    UserOnboarding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceRecommendation {
    EnhancedDueDiligence,
    ManualReview,
}

/// Candidate transaction for AML screening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub amount: Decimal,
    /// Defaults to now
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TransactionRequest {
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmlScreening {
    pub screening_id: Uuid,
    pub user_id: UserId,
    pub screening_type: ScreeningType,
    pub screened_at: DateTime<Utc>,
    pub sanctions_check: CheckStatus,
    /// List that produced the sanctions hit, if any
    pub sanctions_list: Option<String>,
    pub pep_check: CheckStatus,
    pub flags: Vec<AmlFlag>,
    pub status: AmlStatus,
    pub risk_level: AmlRiskLevel,
    pub recommendations: Vec<ComplianceRecommendation>,
}

impl AmlScreening {
    pub fn has_flag(&self, flag: AmlFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_blocked(&self) -> bool {
        self.status == AmlStatus::Blocked
    }
}
