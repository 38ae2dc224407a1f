//! Rapid-transfer scan
//!
//! Batch sweep over recent ledger activity: completed transfers in the
//! trailing window are grouped by sender, and senders with too many transfers
//! or too much volume are reported.

use crate::alerts::{AlertSeverity, FraudAlert};
use crate::config::RapidTransferRules;
use chrono::{DateTime, Duration, Utc};
use ledger_core::{Transaction, TransactionStatus, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One sender's suspicious burst
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    /// Sender
    pub user_id: UserId,

    /// Completed transfers in the window
    pub transfer_count: u64,

    /// Total sent in the window
    pub total_amount: Decimal,

    /// High when the volume limit is crossed
    pub severity: AlertSeverity,
}

/// Rapid-transfer scanner
#[derive(Debug, Clone, Default)]
pub struct RapidTransferScanner {
    rules: RapidTransferRules,
}

impl RapidTransferScanner {
    /// Create new scanner
    pub fn new(rules: RapidTransferRules) -> Self {
        Self { rules }
    }

    /// Start of the window ending at `now`
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::minutes(self.rules.window_minutes)
    }

    /// Scan transactions; anything outside `[window_start, now]` or not
    /// completed is ignored. Results are ordered by user id.
    pub fn scan(&self, transactions: &[Transaction], now: DateTime<Utc>) -> Vec<SuspiciousActivity> {
        let since = self.window_start(now);

        let mut per_sender: BTreeMap<&UserId, (u64, Decimal)> = BTreeMap::new();
        for tx in transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .filter(|tx| tx.timestamp >= since && tx.timestamp <= now)
        {
            let entry = per_sender.entry(&tx.from_user_id).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += tx.amount;
        }

        let found: Vec<SuspiciousActivity> = per_sender
            .into_iter()
            .filter(|(_, (count, total))| {
                *count > self.rules.max_count || *total > self.rules.max_total
            })
            .map(|(user_id, (transfer_count, total_amount))| SuspiciousActivity {
                user_id: user_id.clone(),
                transfer_count,
                total_amount,
                severity: if total_amount > self.rules.max_total {
                    AlertSeverity::High
                } else {
                    AlertSeverity::Medium
                },
            })
            .collect();

        if found.is_empty() {
            debug!(since = %since, "Rapid-transfer scan clean");
        } else {
            info!(since = %since, suspicious = found.len(), "Rapid-transfer scan found activity");
        }

        found
    }

    /// Scan and turn every hit into an open alert
    pub fn scan_alerts(&self, transactions: &[Transaction], now: DateTime<Utc>) -> Vec<FraudAlert> {
        self.scan(transactions, now)
            .iter()
            .map(FraudAlert::from_activity)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn sent(from: &str, amount: Decimal, minutes_ago: i64) -> Transaction {
        Transaction::completed(
            UserId::new(from),
            UserId::new("merchant"),
            amount,
            now() - Duration::minutes(minutes_ago),
        )
    }

    #[test]
    fn test_many_small_transfers_are_medium() {
        let txs: Vec<_> = (0..6).map(|i| sent("alice", dec!(10), i)).collect();

        let found = RapidTransferScanner::default().scan(&txs, now());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, UserId::new("alice"));
        assert_eq!(found[0].transfer_count, 6);
        assert_eq!(found[0].total_amount, dec!(60));
        assert_eq!(found[0].severity, AlertSeverity::Medium);
    }

    #[test]
    fn test_large_volume_is_high() {
        let txs = vec![sent("bob", dec!(4000), 1), sent("bob", dec!(1000.01), 2)];

        let found = RapidTransferScanner::default().scan(&txs, now());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, AlertSeverity::High);
    }

    #[test]
    fn test_limits_are_exclusive() {
        let mut txs: Vec<_> = (0..5).map(|i| sent("carol", dec!(1000), i)).collect();
        // Old and pending transfers do not count
        txs.push(sent("carol", dec!(1000), 11));
        txs.push(
            Transaction::new(UserId::new("carol"), UserId::new("x"), dec!(1), now())
        );

        assert!(RapidTransferScanner::default().scan(&txs, now()).is_empty());
    }

    #[test]
    fn test_scan_alerts() {
        let txs: Vec<_> = (0..7).map(|i| sent("dave", dec!(900), i)).collect();

        let alerts = RapidTransferScanner::default().scan_alerts(&txs, now());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
        assert_eq!(
            alerts[0].description,
            "Suspicious activity: 7 transfers totaling $6300"
        );
    }
}
