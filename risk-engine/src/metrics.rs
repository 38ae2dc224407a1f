//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `risk_assessments_total{risk_level}` - Assessments by outcome
//! - `risk_history_failures_total` - Evaluations aborted by the history store
//! - `risk_evaluation_duration_seconds` - Evaluation latency

use crate::{Error, FraudAssessment, Result};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector
#[derive(Clone)]
pub struct RiskMetrics {
    /// Assessments by risk level
    pub assessments_total: IntCounterVec,

    /// History lookups that failed or timed out
    pub history_failures_total: IntCounter,

    /// Evaluation latency histogram
    pub evaluation_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl RiskMetrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let assessments_total = IntCounterVec::new(
            Opts::new("risk_assessments_total", "Fraud assessments by risk level"),
            &["risk_level"],
        )?;
        registry.register(Box::new(assessments_total.clone()))?;

        let history_failures_total = IntCounter::new(
            "risk_history_failures_total",
            "Evaluations aborted because history was unavailable",
        )?;
        registry.register(Box::new(history_failures_total.clone()))?;

        let evaluation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "risk_evaluation_duration_seconds",
                "Fraud evaluation latency",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 2.5]),
        )?;
        registry.register(Box::new(evaluation_duration.clone()))?;

        Ok(Self {
            assessments_total,
            history_failures_total,
            evaluation_duration,
            registry,
        })
    }

    /// Record one evaluation outcome
    pub fn observe(&self, result: &Result<FraudAssessment>, elapsed: Duration) {
        self.evaluation_duration.observe(elapsed.as_secs_f64());
        match result {
            Ok(assessment) => self
                .assessments_total
                .with_label_values(&[assessment.risk_level.as_str()])
                .inc(),
            Err(Error::HistoryUnavailable(_)) => self.history_failures_total.inc(),
            Err(_) => {}
        }
    }

    /// Text exposition format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::RiskScorer;
    use crate::HistoryAggregates;
    use chrono::Utc;
    use ledger_core::UserId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_observe_counts_by_level() {
        let metrics = RiskMetrics::new().unwrap();
        let assessment = RiskScorer::default()
            .assess(&UserId::new("u"), dec!(10), Utc::now(), HistoryAggregates::default())
            .unwrap();
        let level = assessment.risk_level.as_str();

        metrics.observe(&Ok(assessment), Duration::from_millis(1));
        metrics.observe(
            &Err(Error::HistoryUnavailable("down".to_string())),
            Duration::from_millis(1),
        );

        assert_eq!(metrics.assessments_total.with_label_values(&[level]).get(), 1);
        assert_eq!(metrics.history_failures_total.get(), 1);
        assert!(metrics.gather_text().contains("risk_assessments_total"));
    }

    #[test]
    fn test_independent_registries() {
        // Each collector owns its registry, so building two must not collide
        assert!(RiskMetrics::new().is_ok());
        assert!(RiskMetrics::new().is_ok());
    }
}
