//! In-memory transaction history
//!
//! Sharded by sending user so concurrent evaluations for different users never
//! contend on the same lock.

use crate::history::{TransactionHistory, TransactionWindow};
use crate::types::{StatusFilter, Transaction, TransactionStatus, UserId};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap, DashSet};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Transaction history held in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    // Map: sender -> transactions
    by_sender: Arc<DashMap<UserId, Vec<Transaction>>>,
    // Map: transaction_id -> sender
    senders: Arc<DashMap<Uuid, UserId>>,
    users: Arc<DashSet<UserId>>,
}

impl MemoryLedger {
    /// Create empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with no history yet
    pub fn register_user(&self, user_id: UserId) {
        self.users.insert(user_id);
    }

    /// Record a transaction; both parties become known users
    pub fn record(&self, transaction: Transaction) -> Result<()> {
        transaction.validate()?;

        // The id slot stays locked until the transaction is in its sender's list
        let slot = match self.senders.entry(transaction.id) {
            Entry::Occupied(_) => {
                return Err(Error::InvalidTransaction(format!(
                    "Duplicate transaction ID {}",
                    transaction.id
                )))
            }
            Entry::Vacant(slot) => slot,
        };

        self.users.insert(transaction.from_user_id.clone());
        self.users.insert(transaction.to_user_id.clone());

        tracing::debug!(
            transaction_id = %transaction.id,
            from = %transaction.from_user_id,
            amount = %transaction.amount,
            status = %transaction.status,
            "Transaction recorded"
        );

        let sender = transaction.from_user_id.clone();
        self.by_sender
            .entry(sender.clone())
            .or_default()
            .push(transaction);
        slot.insert(sender);

        Ok(())
    }

    /// Move a transaction to a new status
    ///
    /// Completed transactions are immutable.
    pub fn update_status(&self, transaction_id: Uuid, status: TransactionStatus) -> Result<()> {
        let sender = self
            .senders
            .get(&transaction_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;

        let mut entry = self
            .by_sender
            .get_mut(&sender)
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;

        let transaction = entry
            .value_mut()
            .iter_mut()
            .find(|tx| tx.id == transaction_id)
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;

        if transaction.status == TransactionStatus::Completed {
            return Err(Error::ImmutableTransaction(transaction_id.to_string()));
        }

        transaction.status = status;
        Ok(())
    }

    /// Get a transaction by ID
    pub fn get(&self, transaction_id: Uuid) -> Result<Transaction> {
        let sender = self
            .senders
            .get(&transaction_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;

        self.by_sender
            .get(&sender)
            .and_then(|entry| entry.value().iter().find(|tx| tx.id == transaction_id).cloned())
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))
    }

    /// Outgoing history of one user since `since`
    pub fn window(&self, user_id: &UserId, since: DateTime<Utc>) -> TransactionWindow {
        let transactions = self
            .by_sender
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        TransactionWindow::new(user_id.clone(), since, transactions)
    }

    /// Every user's transactions since `since`, oldest first
    pub fn transactions_since(&self, since: DateTime<Utc>) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = self
            .by_sender
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|tx| tx.timestamp >= since)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        transactions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        transactions
    }

    /// Total number of stored transactions
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[async_trait]
impl TransactionHistory for MemoryLedger {
    async fn query_transaction_count(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        status_filter: StatusFilter,
    ) -> Result<u64> {
        Ok(self.window(user_id, since).count(status_filter))
    }

    async fn query_transaction_sum(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        status_filter: StatusFilter,
    ) -> Result<Decimal> {
        Ok(self.window(user_id, since).sum(status_filter))
    }

    async fn query_same_amount_count(
        &self,
        user_id: &UserId,
        amount: Decimal,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        Ok(self.window(user_id, since).same_amount_count(amount))
    }

    async fn user_exists(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.users.contains(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_and_get() {
        let ledger = MemoryLedger::new();
        let tx = Transaction::completed("alice".into(), "bob".into(), dec!(25.00), Utc::now());
        let id = tx.id;

        ledger.record(tx).unwrap();

        assert_eq!(ledger.get(id).unwrap().amount, dec!(25.00));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let ledger = MemoryLedger::new();
        let tx = Transaction::completed("alice".into(), "bob".into(), dec!(25.00), Utc::now());

        ledger.record(tx.clone()).unwrap();
        assert!(matches!(ledger.record(tx), Err(Error::InvalidTransaction(_))));
    }

    #[test]
    fn test_concurrent_duplicate_record_counted_once() {
        let ledger = MemoryLedger::new();
        let tx = Transaction::completed("alice".into(), "bob".into(), dec!(25.00), Utc::now());

        let accepted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| ledger.record(tx.clone()).is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(accepted, 1);
        assert_eq!(ledger.len(), 1);
        let window = ledger.window(&UserId::new("alice"), tx.timestamp - Duration::minutes(1));
        assert_eq!(window.len(), 1);
        assert_eq!(window.sum(StatusFilter::Completed), dec!(25.00));
    }

    #[test]
    fn test_completed_is_immutable() {
        let ledger = MemoryLedger::new();
        let pending = Transaction::new("alice".into(), "bob".into(), dec!(10), Utc::now());
        let id = pending.id;
        ledger.record(pending).unwrap();

        ledger.update_status(id, TransactionStatus::Completed).unwrap();
        assert!(matches!(
            ledger.update_status(id, TransactionStatus::Failed),
            Err(Error::ImmutableTransaction(_))
        ));
        assert_eq!(ledger.get(id).unwrap().status, TransactionStatus::Completed);
    }

    #[test]
    fn test_unknown_transaction() {
        let ledger = MemoryLedger::new();
        assert!(matches!(
            ledger.update_status(Uuid::new_v4(), TransactionStatus::Completed),
            Err(Error::TransactionNotFound(_))
        ));
    }

    #[test]
    fn test_transactions_since_spans_users() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();

        ledger
            .record(Transaction::completed("alice".into(), "bob".into(), dec!(1), now))
            .unwrap();
        ledger
            .record(Transaction::completed("bob".into(), "carol".into(), dec!(2), now))
            .unwrap();
        ledger
            .record(Transaction::completed(
                "carol".into(),
                "alice".into(),
                dec!(3),
                now - Duration::days(1),
            ))
            .unwrap();

        let recent = ledger.transactions_since(now - Duration::minutes(10));
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_history_queries() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        let alice = UserId::new("alice");

        for minutes in [5, 10, 15] {
            ledger
                .record(Transaction::completed(
                    alice.clone(),
                    "bob".into(),
                    dec!(500),
                    now - Duration::minutes(minutes),
                ))
                .unwrap();
        }
        ledger
            .record(Transaction::new(alice.clone(), "bob".into(), dec!(500), now))
            .unwrap();

        let since = now - Duration::hours(1);
        assert_eq!(
            ledger
                .query_transaction_count(&alice, since, StatusFilter::Completed)
                .await
                .unwrap(),
            3
        );
        assert_eq!(
            ledger
                .query_transaction_sum(&alice, since, StatusFilter::Any)
                .await
                .unwrap(),
            dec!(2000)
        );
        assert_eq!(
            ledger
                .query_same_amount_count(&alice, dec!(500), since)
                .await
                .unwrap(),
            3
        );
        assert!(ledger.user_exists(&alice).await.unwrap());
        assert!(!ledger.user_exists(&UserId::new("mallory")).await.unwrap());
    }
}
