//! Transaction limit checking
//!
//! Daily and monthly caps come from the sender's KYC level. Totals are trailing
//! sums of completed transfers: 24 hours for the daily cap, 30 days for the
//! monthly one.

use crate::engine::bounded;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use ledger_core::{KycLevel, StatusFilter, TransactionHistory, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spend so far and what remains under a level's caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitUsage {
    /// Completed volume in the trailing 24 hours
    pub daily_total: Decimal,

    /// Completed volume in the trailing 30 days
    pub monthly_total: Decimal,

    /// Headroom under the daily cap
    pub daily_remaining: Decimal,

    /// Headroom under the monthly cap
    pub monthly_remaining: Decimal,
}

/// Limit checker
#[derive(Debug, Clone, Copy)]
pub struct LimitChecker {
    level: KycLevel,
}

impl LimitChecker {
    /// Create new limit checker for a KYC level
    pub fn new(level: KycLevel) -> Self {
        Self { level }
    }

    /// Level whose caps apply
    pub fn level(&self) -> KycLevel {
        self.level
    }

    /// Check daily limit
    pub fn check_daily_limit(&self, amount: Decimal, daily_total: Decimal) -> Result<()> {
        let limit = self.level.daily_limit();
        if daily_total + amount > limit {
            return Err(Error::LimitExceeded(format!(
                "Daily limit {} for {} KYC would be exceeded: {} + {}",
                limit, self.level, daily_total, amount
            )));
        }
        Ok(())
    }

    /// Check monthly limit
    pub fn check_monthly_limit(&self, amount: Decimal, monthly_total: Decimal) -> Result<()> {
        let limit = self.level.monthly_limit();
        if monthly_total + amount > limit {
            return Err(Error::LimitExceeded(format!(
                "Monthly limit {} for {} KYC would be exceeded: {} + {}",
                limit, self.level, monthly_total, amount
            )));
        }
        Ok(())
    }

    /// Current usage from history
    pub async fn usage(
        &self,
        history: &dyn TransactionHistory,
        user_id: &UserId,
        at: DateTime<Utc>,
        timeout: std::time::Duration,
    ) -> Result<LimitUsage> {
        let (daily_total, monthly_total) = tokio::try_join!(
            bounded(
                "daily sum",
                timeout,
                history.query_transaction_sum(user_id, at - Duration::hours(24), StatusFilter::Completed),
            ),
            bounded(
                "monthly sum",
                timeout,
                history.query_transaction_sum(user_id, at - Duration::days(30), StatusFilter::Completed),
            ),
        )?;

        Ok(LimitUsage {
            daily_total,
            monthly_total,
            daily_remaining: (self.level.daily_limit() - daily_total).max(Decimal::ZERO),
            monthly_remaining: (self.level.monthly_limit() - monthly_total).max(Decimal::ZERO),
        })
    }

    /// Check a candidate against both caps using history totals
    pub async fn check(
        &self,
        history: &dyn TransactionHistory,
        user_id: &UserId,
        amount: Decimal,
        at: DateTime<Utc>,
        timeout: std::time::Duration,
    ) -> Result<LimitUsage> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidArgument(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }

        let usage = self.usage(history, user_id, at, timeout).await?;
        self.check_daily_limit(amount, usage.daily_total)?;
        self.check_monthly_limit(amount, usage.monthly_total)?;

        tracing::debug!(
            user_id = %user_id,
            kyc_level = %self.level,
            amount = %amount,
            daily_total = %usage.daily_total,
            "Within KYC limits"
        );
        Ok(usage)
    }
}
