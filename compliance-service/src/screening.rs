use crate::config::AmlConfig;
use crate::error::{ComplianceError, Result};
use crate::pep::PepChecker;
use crate::sanctions::SanctionsEngine;
use crate::types::{
    AmlFlag, AmlRiskLevel, AmlScreening, AmlStatus, CheckStatus, ComplianceRecommendation,
    ScreeningType, TransactionRequest, UserProfile,
};
use chrono::{DateTime, Duration, Utc};
use ledger_core::{StatusFilter, TransactionHistory, UserId};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// AmlFlagEvaluator screens users and transactions for AML flags
///
/// Independent of fraud scoring: it shares the history interface, not the
/// weights.
pub struct AmlFlagEvaluator {
    history: Arc<dyn TransactionHistory>,
    sanctions: Arc<SanctionsEngine>,
    pep: PepChecker,
    config: Arc<AmlConfig>,
}

impl AmlFlagEvaluator {
    pub fn new(
        history: Arc<dyn TransactionHistory>,
        sanctions: Arc<SanctionsEngine>,
        config: AmlConfig,
    ) -> Result<Self> {
        config.validate()?;

        for path in &config.sanctions_lists {
            sanctions.load_csv_file(path)?;
        }

        Ok(Self {
            history,
            sanctions,
            pep: PepChecker::new(&config.pep_keywords),
            config: Arc::new(config),
        })
    }

    /// Screen a user, and optionally a candidate transaction of theirs
    ///
    /// Flags are ordered: list checks, then amount patterns, then history.
    pub async fn evaluate_aml(
        &self,
        profile: &UserProfile,
        transaction: Option<&TransactionRequest>,
    ) -> Result<AmlScreening> {
        let screening_id = Uuid::new_v4();
        let mut flags = Vec::new();
        let mut recommendations = Vec::new();

        // 1. Sanctions lists
        let sanctions_hits = self.sanctions.check_name(&profile.full_name);
        let sanctions_check = if sanctions_hits.is_empty() {
            CheckStatus::Clear
        } else {
            flags.push(AmlFlag::SanctionsMatch);
            warn!(
                user_id = %profile.user_id,
                list = %sanctions_hits[0].list,
                screening_id = %screening_id,
                "Sanctions match"
            );
            CheckStatus::Match
        };

        // 2. Politically exposed persons
        let pep_check = match self.pep.check(&profile.full_name) {
            Some(keyword) => {
                flags.push(AmlFlag::PepMatch);
                recommendations.push(ComplianceRecommendation::EnhancedDueDiligence);
                debug!(user_id = %profile.user_id, keyword, "PEP match");
                CheckStatus::Match
            }
            None => CheckStatus::Clear,
        };

        // 3. Transaction patterns
        let screened_at = match transaction {
            Some(tx) => {
                let at = tx.timestamp.unwrap_or_else(Utc::now);
                self.transaction_flags(&profile.user_id, tx.amount, at, &mut flags, &mut recommendations)
                    .await?;
                at
            }
            None => Utc::now(),
        };

        let status = if flags.contains(&AmlFlag::SanctionsMatch) {
            AmlStatus::Blocked
        } else {
            AmlStatus::Clear
        };
        let risk_level = AmlRiskLevel::from_flag_count(flags.len());

        if status == AmlStatus::Blocked || risk_level == AmlRiskLevel::High {
            info!(
                user_id = %profile.user_id,
                status = ?status,
                risk_level = ?risk_level,
                flags = ?flags,
                "AML screening needs attention"
            );
        }

        Ok(AmlScreening {
            screening_id,
            user_id: profile.user_id.clone(),
            screening_type: if transaction.is_some() {
                ScreeningType::Transaction
            } else {
                ScreeningType::UserOnboarding
            },
            screened_at,
            sanctions_check,
            sanctions_list: sanctions_hits.first().map(|m| m.list.clone()),
            pep_check,
            flags,
            status,
            risk_level,
            recommendations,
        })
    }

    async fn transaction_flags(
        &self,
        user_id: &UserId,
        amount: Decimal,
        at: DateTime<Utc>,
        flags: &mut Vec<AmlFlag>,
        recommendations: &mut Vec<ComplianceRecommendation>,
    ) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(ComplianceError::InvalidInput(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }

        let cfg = &self.config;
        let timeout = cfg.history_timeout();

        let (same_amount_count, recent_count, daily_total) = tokio::try_join!(
            bounded(
                "same-amount count",
                timeout,
                self.history.query_same_amount_count(
                    user_id,
                    amount,
                    at - Duration::days(cfg.repeat_window_days),
                ),
            ),
            bounded(
                "velocity count",
                timeout,
                self.history.query_transaction_count(
                    user_id,
                    at - Duration::minutes(cfg.velocity_window_minutes),
                    StatusFilter::Completed,
                ),
            ),
            bounded(
                "daily volume",
                timeout,
                self.history.query_transaction_sum(
                    user_id,
                    at - Duration::hours(cfg.daily_window_hours),
                    StatusFilter::Completed,
                ),
            ),
        )?;

        if (amount % cfg.round_unit).is_zero() {
            flags.push(AmlFlag::RoundAmount);
        }
        if same_amount_count >= cfg.repeat_min_count {
            flags.push(AmlFlag::RepeatedAmounts);
        }
        if amount > cfg.high_value_threshold {
            flags.push(AmlFlag::HighValueTransaction);
            recommendations.push(ComplianceRecommendation::ManualReview);
        }
        if recent_count > cfg.velocity_max_count {
            flags.push(AmlFlag::HighVelocity);
        }
        if daily_total > cfg.daily_volume_threshold {
            flags.push(AmlFlag::HighDailyVolume);
        }

        Ok(())
    }
}

async fn bounded<T, F>(what: &str, timeout: std::time::Duration, lookup: F) -> Result<T>
where
    F: Future<Output = ledger_core::Result<T>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(result) => result.map_err(|e| {
            warn!(lookup = what, error = %e, "History lookup failed");
            ComplianceError::HistoryUnavailable(format!("{}: {}", what, e))
        }),
        Err(_) => {
            warn!(lookup = what, "History lookup timed out");
            Err(ComplianceError::HistoryUnavailable(format!(
                "{} timed out after {}ms",
                what,
                timeout.as_millis()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ledger_core::{MemoryLedger, Transaction};
    use rust_decimal_macros::dec;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap()
    }

    fn evaluator(ledger: &MemoryLedger) -> AmlFlagEvaluator {
        AmlFlagEvaluator::new(
            Arc::new(ledger.clone()),
            Arc::new(SanctionsEngine::with_mock_list()),
            AmlConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_onboarding_clear() {
        let screening = evaluator(&MemoryLedger::new())
            .evaluate_aml(&UserProfile::new("u1", "Maria Lopez"), None)
            .await
            .unwrap();

        assert_eq!(screening.screening_type, ScreeningType::UserOnboarding);
        assert_eq!(screening.status, AmlStatus::Clear);
        assert_eq!(screening.risk_level, AmlRiskLevel::Low);
        assert!(screening.flags.is_empty());
    }

    #[tokio::test]
    async fn test_sanctions_match_blocks() {
        let screening = evaluator(&MemoryLedger::new())
            .evaluate_aml(&UserProfile::new("u2", "John Doe"), None)
            .await
            .unwrap();

        assert!(screening.is_blocked());
        assert_eq!(screening.sanctions_check, CheckStatus::Match);
        assert_eq!(screening.sanctions_list.as_deref(), Some("OFAC_SDN"));
        assert_eq!(screening.flags, vec![AmlFlag::SanctionsMatch]);
        // One flag on its own stays low
        assert_eq!(screening.risk_level, AmlRiskLevel::Low);
    }

    #[tokio::test]
    async fn test_pep_is_not_blocking() {
        let screening = evaluator(&MemoryLedger::new())
            .evaluate_aml(&UserProfile::new("u3", "Governor Ana Ruiz"), None)
            .await
            .unwrap();

        assert_eq!(screening.status, AmlStatus::Clear);
        assert_eq!(screening.pep_check, CheckStatus::Match);
        assert_eq!(
            screening.recommendations,
            vec![ComplianceRecommendation::EnhancedDueDiligence]
        );
    }

    #[tokio::test]
    async fn test_transaction_flags_in_order() {
        let ledger = MemoryLedger::new();
        let user = UserId::new("u4");
        for i in 0..6 {
            ledger
                .record(Transaction::completed(
                    user.clone(),
                    UserId::new("shop"),
                    dec!(2000),
                    noon() - Duration::minutes(i + 1),
                ))
                .unwrap();
        }

        let screening = evaluator(&ledger)
            .evaluate_aml(
                &UserProfile::new("u4", "Senator Ana Ruiz"),
                Some(&TransactionRequest::new(dec!(2000)).at(noon())),
            )
            .await
            .unwrap();

        assert_eq!(
            screening.flags,
            vec![
                AmlFlag::PepMatch,
                AmlFlag::RoundAmount,
                AmlFlag::RepeatedAmounts,
                AmlFlag::HighVelocity,
                AmlFlag::HighDailyVolume,
            ]
        );
        assert_eq!(screening.risk_level, AmlRiskLevel::High);
        assert_eq!(screening.status, AmlStatus::Clear);
        assert_eq!(screening.screened_at, noon());
    }

    #[tokio::test]
    async fn test_high_value_recommends_review() {
        let screening = evaluator(&MemoryLedger::new())
            .evaluate_aml(
                &UserProfile::new("u5", "Luis Vega"),
                Some(&TransactionRequest::new(dec!(10000.01)).at(noon())),
            )
            .await
            .unwrap();

        assert_eq!(screening.flags, vec![AmlFlag::HighValueTransaction]);
        assert_eq!(
            screening.recommendations,
            vec![ComplianceRecommendation::ManualReview]
        );
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let result = evaluator(&MemoryLedger::new())
            .evaluate_aml(
                &UserProfile::new("u6", "Luis Vega"),
                Some(&TransactionRequest::new(dec!(0))),
            )
            .await;

        assert!(matches!(result, Err(ComplianceError::InvalidInput(_))));
    }
}
