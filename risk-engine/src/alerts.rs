//! Fraud alerts
//!
//! The engine builds alerts; delivering them (database, pager, case queue) is
//! the caller's job through [`AlertSink`].

use crate::velocity::SuspiciousActivity;
use crate::{Error, FraudAssessment, Result, RiskLevel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger_core::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Needs review
    Medium,
    /// Needs review now
    High,
}

/// Alert workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Awaiting an analyst
    Open,
    /// Closed by an analyst
    Resolved,
}

/// What produced the alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AlertSource {
    /// Real-time transaction assessment
    Assessment(FraudAssessment),
    /// Periodic rapid-transfer scan
    RapidTransfers(SuspiciousActivity),
}

/// Fraud alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAlert {
    /// Alert ID
    pub alert_id: Uuid,

    /// Subject of the alert
    pub user_id: UserId,

    /// Severity
    pub severity: AlertSeverity,

    /// Workflow status
    pub status: AlertStatus,

    /// Human-readable summary
    pub description: String,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Evidence
    pub source: AlertSource,
}

impl FraudAlert {
    /// Alert for a medium or high assessment; `None` otherwise
    pub fn from_assessment(assessment: &FraudAssessment) -> Option<Self> {
        let severity = match assessment.risk_level {
            RiskLevel::High => AlertSeverity::High,
            RiskLevel::Medium => AlertSeverity::Medium,
            RiskLevel::Low | RiskLevel::Minimal => return None,
        };

        let flags = assessment
            .flags
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Some(Self {
            alert_id: Uuid::new_v4(),
            user_id: assessment.user_id.clone(),
            severity,
            status: AlertStatus::Open,
            description: format!("Fraud score: {} - {}", assessment.score, flags),
            created_at: Utc::now(),
            source: AlertSource::Assessment(assessment.clone()),
        })
    }

    /// Alert for a rapid-transfer scan hit
    pub fn from_activity(activity: &SuspiciousActivity) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            user_id: activity.user_id.clone(),
            severity: activity.severity,
            status: AlertStatus::Open,
            description: format!(
                "Suspicious activity: {} transfers totaling ${}",
                activity.transfer_count, activity.total_amount
            ),
            created_at: Utc::now(),
            source: AlertSource::RapidTransfers(activity.clone()),
        }
    }
}

/// Destination for fraud alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert
    async fn raise(&self, alert: FraudAlert) -> Result<()>;
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn raise(&self, alert: FraudAlert) -> Result<()> {
        tracing::warn!(
            alert_id = %alert.alert_id,
            user_id = %alert.user_id,
            severity = ?alert.severity,
            "Fraud alert created: {}",
            alert.description
        );
        Ok(())
    }
}

/// Sink that keeps alerts in memory
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: Mutex<Vec<FraudAlert>>,
}

impl MemoryAlertSink {
    /// Create empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts received so far
    ///
    /// Still readable after a panic poisoned the lock; new alerts are refused.
    pub fn alerts(&self) -> Vec<FraudAlert> {
        match self.alerts.lock() {
            Ok(alerts) => alerts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn raise(&self, alert: FraudAlert) -> Result<()> {
        self.alerts
            .lock()
            .map_err(|e| Error::AlertDelivery(e.to_string()))?
            .push(alert);
        Ok(())
    }
}
