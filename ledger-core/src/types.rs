//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wallet user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Transaction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Submitted, not yet settled
    Pending,
    /// Settled; immutable from here on
    Completed,
    /// Rejected or errored
    Failed,
}

impl TransactionStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    /// Whether this is a final state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which statuses a history query should include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    /// Completed transactions only
    #[default]
    Completed,
    /// Every status
    Any,
    /// Exactly one status
    Only(TransactionStatus),
}

impl StatusFilter {
    /// Check whether a status passes the filter
    pub fn matches(&self, status: TransactionStatus) -> bool {
        match self {
            StatusFilter::Completed => status == TransactionStatus::Completed,
            StatusFilter::Any => true,
            StatusFilter::Only(wanted) => status == *wanted,
        }
    }
}

/// Wallet transfer between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: Uuid,

    /// Sending user
    pub from_user_id: UserId,

    /// Receiving user
    pub to_user_id: UserId,

    /// Amount (exact decimal, non-negative)
    pub amount: Decimal,

    /// When the transaction was created
    pub timestamp: DateTime<Utc>,

    /// Lifecycle status
    pub status: TransactionStatus,
}

impl Transaction {
    /// Create a pending transaction
    pub fn new(
        from_user_id: UserId,
        to_user_id: UserId,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_user_id,
            to_user_id,
            amount,
            timestamp,
            status: TransactionStatus::Pending,
        }
    }

    /// Create a transaction that has already settled
    pub fn completed(
        from_user_id: UserId,
        to_user_id: UserId,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            status: TransactionStatus::Completed,
            ..Self::new(from_user_id, to_user_id, amount, timestamp)
        }
    }

    /// Set status (builder style)
    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// Check the amount is not negative
    pub fn validate(&self) -> crate::Result<()> {
        if self.amount < Decimal::ZERO {
            return Err(crate::Error::InvalidTransaction(format!(
                "Transaction {} has negative amount {}",
                self.id, self.amount
            )));
        }
        Ok(())
    }
}

/// KYC verification tier; sets the user's transfer limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycLevel {
    /// Government ID and basic info
    Basic,
    /// Adds proof of address and SSN verification
    Enhanced,
    /// Adds income verification
    Premium,
}

impl KycLevel {
    /// All levels, lowest first
    pub const ALL: [KycLevel; 3] = [KycLevel::Basic, KycLevel::Enhanced, KycLevel::Premium];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            KycLevel::Basic => "basic",
            KycLevel::Enhanced => "enhanced",
            KycLevel::Premium => "premium",
        }
    }

    /// Daily transfer limit
    pub fn daily_limit(&self) -> Decimal {
        match self {
            KycLevel::Basic => Decimal::from(1_000),
            KycLevel::Enhanced => Decimal::from(5_000),
            KycLevel::Premium => Decimal::from(25_000),
        }
    }

    /// Monthly transfer limit
    pub fn monthly_limit(&self) -> Decimal {
        match self {
            KycLevel::Basic => Decimal::from(5_000),
            KycLevel::Enhanced => Decimal::from(25_000),
            KycLevel::Premium => Decimal::from(100_000),
        }
    }
}

impl fmt::Display for KycLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
