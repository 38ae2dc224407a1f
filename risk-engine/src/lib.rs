//! Risk Engine for DalePay
//!
//! Rules-based fraud scoring for wallet transfers: velocity, amount patterns
//! and timing are scored separately, combined with fixed weights, and bucketed
//! into a risk level and recommended action.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alerts;
pub mod config;
pub mod engine;
pub mod error;
pub mod limits;
pub mod metrics;
pub mod scoring;
pub mod types;
pub mod velocity;

pub use alerts::{AlertSeverity, AlertSink, AlertSource, AlertStatus, FraudAlert, MemoryAlertSink, TracingAlertSink};
pub use config::RiskConfig;
pub use engine::RiskScoringEngine;
pub use error::{Error, Result};
pub use limits::{LimitChecker, LimitUsage};
pub use metrics::RiskMetrics;
pub use scoring::RiskScorer;
pub use types::*;
pub use velocity::{RapidTransferScanner, SuspiciousActivity};
