//! Risk scoring
//!
//! Pure functions of (candidate, history aggregates, config). No I/O happens
//! here; [`crate::engine`] fetches the aggregates.

use crate::config::RiskConfig;
use crate::{
    Error, FraudAssessment, FraudFlag, HistoryAggregates, Recommendation, Result, RiskFactor,
    RiskFactorScore, RiskLevel, RiskScore,
};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use ledger_core::UserId;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Risk scorer
#[derive(Debug, Clone)]
pub struct RiskScorer {
    config: Arc<RiskConfig>,
}

impl RiskScorer {
    /// Create new risk scorer
    pub fn new(config: Arc<RiskConfig>) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Velocity sub-score from the trailing-window count
    pub fn velocity_score(&self, recent_count: u64) -> f64 {
        let rules = &self.config.velocity;
        rules
            .breakpoints
            .iter()
            .find(|b| recent_count > b.above)
            .map_or(rules.baseline, |b| b.score)
    }

    /// Amount pattern sub-score
    ///
    /// The round-amount and just-under-threshold bonuses stack.
    pub fn amount_pattern_score(&self, amount: Decimal, same_amount_count: u64) -> f64 {
        let rules = &self.config.amount_patterns;
        let mut score = 0.0;

        if amount > Decimal::ZERO && (amount % rules.round_unit).is_zero() {
            score += rules.round_bonus;
        }

        if amount >= rules.structuring_min && amount <= rules.structuring_max {
            score += rules.structuring_bonus;
        }

        if same_amount_count >= rules.repeat_min_count {
            score += rules.repeat_bonus;
        }

        f64::min(score, 1.0).max(0.0)
    }

    /// Timing sub-score; late night wins over weekend
    pub fn timing_score(&self, at: DateTime<Utc>) -> f64 {
        let rules = &self.config.timing;
        let hour = at.hour();

        if hour < rules.night_before_hour || hour > rules.night_after_hour {
            return rules.night_score;
        }

        if matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
            return rules.weekend_score;
        }

        rules.baseline
    }

    /// Weighted sum of sub-scores, without renormalisation
    pub fn composite(&self, velocity: f64, amount_patterns: f64, timing: f64) -> RiskScore {
        let w = &self.config.weights;
        RiskScore::new(
            velocity * w.velocity + amount_patterns * w.amount_patterns + timing * w.timing,
        )
    }

    /// Flags for sub-scores above their own thresholds
    pub fn flags(&self, velocity: f64, amount_patterns: f64, timing: f64) -> Vec<FraudFlag> {
        let t = &self.config.flags;
        let mut flags = Vec::new();
        if velocity > t.velocity {
            flags.push(FraudFlag::HighVelocity);
        }
        if amount_patterns > t.amount_patterns {
            flags.push(FraudFlag::SuspiciousAmounts);
        }
        if timing > t.timing {
            flags.push(FraudFlag::UnusualTiming);
        }
        flags
    }

    /// Risk level for a composite score
    pub fn level(&self, score: RiskScore) -> RiskLevel {
        RiskLevel::from_score(score, &self.config.levels)
    }

    /// Assess a candidate transaction against pre-fetched history
    pub fn assess(
        &self,
        user_id: &UserId,
        amount: Decimal,
        at: DateTime<Utc>,
        history: HistoryAggregates,
    ) -> Result<FraudAssessment> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidArgument(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }

        let velocity = self.velocity_score(history.recent_count);
        let amount_patterns = self.amount_pattern_score(amount, history.same_amount_count);
        let timing = self.timing_score(at);

        let score = self.composite(velocity, amount_patterns, timing);
        let risk_level = self.level(score);

        Ok(FraudAssessment {
            user_id: user_id.clone(),
            amount,
            evaluated_at: at,
            score,
            factors: vec![
                RiskFactorScore { factor: RiskFactor::Velocity, score: velocity },
                RiskFactorScore { factor: RiskFactor::AmountPatterns, score: amount_patterns },
                RiskFactorScore { factor: RiskFactor::Timing, score: timing },
            ],
            flags: self.flags(velocity, amount_patterns, timing),
            risk_level,
            recommendation: Recommendation::from(risk_level),
        })
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(Arc::new(RiskConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    // Wednesday 2024-01-10
    fn weekday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    fn assess(amount: Decimal, history: HistoryAggregates) -> FraudAssessment {
        RiskScorer::default()
            .assess(&UserId::new("user-1"), amount, weekday_noon(), history)
            .unwrap()
    }

    #[test]
    fn test_velocity_breakpoints() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.velocity_score(0), 0.1);
        assert_eq!(scorer.velocity_score(3), 0.1);
        assert_eq!(scorer.velocity_score(4), 0.4);
        assert_eq!(scorer.velocity_score(5), 0.4);
        assert_eq!(scorer.velocity_score(6), 0.7);
        assert_eq!(scorer.velocity_score(10), 0.7);
        assert_eq!(scorer.velocity_score(11), 1.0);
    }

    #[test]
    fn test_amount_patterns() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.amount_pattern_score(dec!(50.00), 0), 0.0);
        assert_eq!(scorer.amount_pattern_score(dec!(5000.00), 0), 0.3);
        assert_eq!(scorer.amount_pattern_score(dec!(9999.00), 0), 0.8);
        assert_eq!(scorer.amount_pattern_score(dec!(9500), 0), 0.8);
        assert_eq!(scorer.amount_pattern_score(dec!(9499.99), 0), 0.0);
        assert_eq!(scorer.amount_pattern_score(dec!(10000), 0), 0.3);
        // Repeated amounts
        assert_eq!(scorer.amount_pattern_score(dec!(42), 2), 0.0);
        assert_eq!(scorer.amount_pattern_score(dec!(42), 3), 0.5);
        // Clamped: 0.3 + 0.5 is fine, 0.8 + 0.5 is not
        assert!((scorer.amount_pattern_score(dec!(3000), 3) - 0.8).abs() < 1e-12);
        assert_eq!(scorer.amount_pattern_score(dec!(9999), 3), 1.0);
    }

    #[test]
    fn round_and_structuring_bonuses_stack() {
        // Only reachable when the round unit falls inside the band
        let mut config = RiskConfig::default();
        config.amount_patterns.round_unit = dec!(500);
        let scorer = RiskScorer::new(Arc::new(config));

        assert_eq!(scorer.amount_pattern_score(dec!(9500), 0), 1.0);
        assert!((scorer.amount_pattern_score(dec!(9000), 0) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_timing_rules() {
        let scorer = RiskScorer::default();
        // Wednesday
        assert_eq!(scorer.timing_score(Utc.with_ymd_and_hms(2024, 1, 10, 3, 0, 0).unwrap()), 0.6);
        assert_eq!(scorer.timing_score(Utc.with_ymd_and_hms(2024, 1, 10, 6, 0, 0).unwrap()), 0.1);
        assert_eq!(scorer.timing_score(Utc.with_ymd_and_hms(2024, 1, 10, 23, 30, 0).unwrap()), 0.1);
        // Saturday
        assert_eq!(scorer.timing_score(Utc.with_ymd_and_hms(2024, 1, 13, 14, 0, 0).unwrap()), 0.3);
        // Sunday early morning: late night wins
        assert_eq!(scorer.timing_score(Utc.with_ymd_and_hms(2024, 1, 14, 2, 0, 0).unwrap()), 0.6);
    }

    #[test]
    fn test_small_payment_is_approved() {
        let assessment = assess(dec!(50.00), HistoryAggregates::default());

        assert_eq!(assessment.factor_score(RiskFactor::Velocity), Some(0.1));
        assert_eq!(assessment.factor_score(RiskFactor::AmountPatterns), Some(0.0));
        assert_eq!(assessment.factor_score(RiskFactor::Timing), Some(0.1));
        assert!((assessment.score.value() - 0.04).abs() < 1e-9);
        assert_eq!(assessment.risk_level, RiskLevel::Minimal);
        assert_eq!(assessment.recommendation, Recommendation::Approve);
        assert!(assessment.flags.is_empty());
    }

    #[test]
    fn test_just_under_threshold_is_flagged() {
        let assessment = assess(dec!(9999.00), HistoryAggregates::default());

        assert_eq!(assessment.factor_score(RiskFactor::AmountPatterns), Some(0.8));
        assert!(assessment.has_flag(FraudFlag::SuspiciousAmounts));
        // 0.03 + 0.2 + 0.01
        assert!((assessment.score.value() - 0.24).abs() < 1e-9);
        assert_eq!(assessment.risk_level, RiskLevel::Minimal);
    }

    #[test]
    fn test_round_amount_not_flagged() {
        let assessment = assess(dec!(5000.00), HistoryAggregates::default());

        assert_eq!(assessment.factor_score(RiskFactor::AmountPatterns), Some(0.3));
        assert!(!assessment.has_flag(FraudFlag::SuspiciousAmounts));
    }

    #[test]
    fn test_high_velocity_flag() {
        let assessment = assess(
            dec!(20),
            HistoryAggregates {
                recent_count: 11,
                same_amount_count: 0,
            },
        );

        assert_eq!(assessment.factor_score(RiskFactor::Velocity), Some(1.0));
        assert!(assessment.has_flag(FraudFlag::HighVelocity));
        assert_eq!(assessment.flags, vec![FraudFlag::HighVelocity]);
    }

    #[test]
    fn composite_is_not_renormalised() {
        let scorer = RiskScorer::default();

        // All factors at their maximum: 0.3 + 0.25 + 0.1
        let max = scorer.composite(1.0, 1.0, 1.0);
        assert!((max.value() - crate::config::UNNORMALIZED_WEIGHT_SUM).abs() < 1e-12);
        assert_eq!(scorer.level(max), RiskLevel::Medium);

        // 0.3*0.7 + 0.25*0.8 + 0.1*0.6 = 0.47
        assert!((scorer.composite(0.7, 0.8, 0.6).value() - 0.47).abs() < 1e-12);
    }

    #[test]
    fn test_worst_case_with_default_weights_is_manual_review() {
        let assessment = RiskScorer::default()
            .assess(
                &UserId::new("user-1"),
                dec!(9999),
                Utc.with_ymd_and_hms(2024, 1, 10, 2, 0, 0).unwrap(),
                HistoryAggregates {
                    recent_count: 20,
                    same_amount_count: 5,
                },
            )
            .unwrap();

        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.recommendation, Recommendation::ManualReview);
        assert_eq!(
            assessment.flags,
            vec![
                FraudFlag::HighVelocity,
                FraudFlag::SuspiciousAmounts,
                FraudFlag::UnusualTiming
            ]
        );
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let scorer = RiskScorer::default();
        for amount in [dec!(0), dec!(-0.01), dec!(-500)] {
            assert!(matches!(
                scorer.assess(&UserId::new("u"), amount, weekday_noon(), HistoryAggregates::default()),
                Err(Error::InvalidArgument(_))
            ));
        }
    }
}
