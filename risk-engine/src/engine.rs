//! Risk scoring engine
//!
//! Fetches history aggregates through [`TransactionHistory`], bounded by the
//! configured timeout, and hands them to the pure [`RiskScorer`].

use crate::alerts::{AlertSink, FraudAlert};
use crate::config::RiskConfig;
use crate::metrics::RiskMetrics;
use crate::scoring::RiskScorer;
use crate::{Error, FraudAssessment, HistoryAggregates, Result, RiskLevel};
use chrono::{DateTime, Duration, Utc};
use ledger_core::{StatusFilter, TransactionHistory, UserId};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Fraud scoring over a user's transaction history
pub struct RiskScoringEngine {
    history: Arc<dyn TransactionHistory>,
    scorer: RiskScorer,
    config: Arc<RiskConfig>,
    metrics: Option<RiskMetrics>,
}

impl RiskScoringEngine {
    /// Create engine; the configuration is validated once here
    pub fn new(history: Arc<dyn TransactionHistory>, config: RiskConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        Ok(Self {
            history,
            scorer: RiskScorer::new(config.clone()),
            config,
            metrics: None,
        })
    }

    /// Record assessment counters and latencies
    pub fn with_metrics(mut self, metrics: RiskMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The pure scorer behind this engine
    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// Score a candidate transaction
    ///
    /// `timestamp` defaults to now. History failures are returned as
    /// [`Error::HistoryUnavailable`], never scored as an empty history.
    pub async fn evaluate_transaction(
        &self,
        user_id: &UserId,
        amount: Decimal,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<FraudAssessment> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidArgument(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }

        let started = Instant::now();
        let at = timestamp.unwrap_or_else(Utc::now);

        let result = self.fetch_and_score(user_id, amount, at).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe(&result, started.elapsed());
        }

        let assessment = result?;

        if assessment.risk_level >= RiskLevel::Medium {
            warn!(
                user_id = %user_id,
                amount = %amount,
                score = %assessment.score,
                risk_level = %assessment.risk_level,
                flags = ?assessment.flags,
                "Elevated fraud risk"
            );
        } else {
            debug!(
                user_id = %user_id,
                amount = %amount,
                score = %assessment.score,
                risk_level = %assessment.risk_level,
                "Transaction scored"
            );
        }

        Ok(assessment)
    }

    /// Score a candidate and raise an alert for medium/high outcomes
    pub async fn evaluate_and_alert(
        &self,
        user_id: &UserId,
        amount: Decimal,
        timestamp: Option<DateTime<Utc>>,
        sink: &dyn AlertSink,
    ) -> Result<FraudAssessment> {
        let assessment = self.evaluate_transaction(user_id, amount, timestamp).await?;

        if let Some(alert) = FraudAlert::from_assessment(&assessment) {
            sink.raise(alert).await?;
        }

        Ok(assessment)
    }

    async fn fetch_and_score(
        &self,
        user_id: &UserId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<FraudAssessment> {
        let timeout = self.config.history_timeout();

        if self.config.require_known_user {
            let exists = bounded("user lookup", timeout, self.history.user_exists(user_id)).await?;
            if !exists {
                return Err(Error::UnknownUser(user_id.to_string()));
            }
        }

        let velocity_since = at - Duration::minutes(self.config.velocity.window_minutes);
        let repeat_since = at - Duration::days(self.config.amount_patterns.repeat_window_days);

        let (recent_count, same_amount_count) = tokio::try_join!(
            bounded(
                "velocity count",
                timeout,
                self.history
                    .query_transaction_count(user_id, velocity_since, StatusFilter::Completed),
            ),
            bounded(
                "same-amount count",
                timeout,
                self.history.query_same_amount_count(user_id, amount, repeat_since),
            ),
        )?;

        self.scorer.assess(
            user_id,
            amount,
            at,
            HistoryAggregates {
                recent_count,
                same_amount_count,
            },
        )
    }
}

/// Run a history lookup under a timeout, mapping every failure to
/// [`Error::HistoryUnavailable`]
pub(crate) async fn bounded<T, F>(what: &str, timeout: std::time::Duration, lookup: F) -> Result<T>
where
    F: Future<Output = ledger_core::Result<T>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(lookup = what, error = %e, "History lookup failed");
            Err(Error::HistoryUnavailable(format!("{}: {}", what, e)))
        }
        Err(_) => {
            warn!(lookup = what, timeout_ms = timeout.as_millis() as u64, "History lookup timed out");
            Err(Error::HistoryUnavailable(format!(
                "{} timed out after {}ms",
                what,
                timeout.as_millis()
            )))
        }
    }
}

/// Parse an RFC 3339 timestamp supplied by a caller
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidArgument(format!("Malformed timestamp {:?}: {}", value, e)))
}
