//! Read-only history queries
//!
//! [`TransactionHistory`] is the collaborator interface the evaluators call.
//! Stores answer it by materialising a [`TransactionWindow`] and aggregating
//! over it, so every store shares one definition of "count" and "sum".

use crate::types::{StatusFilter, Transaction, TransactionStatus, UserId};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// History lookups used by risk scoring and AML screening
///
/// All queries look at transactions *sent* by `user_id` with a timestamp at or
/// after `since`.
#[async_trait]
pub trait TransactionHistory: Send + Sync {
    /// Number of transactions matching `status_filter`
    async fn query_transaction_count(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        status_filter: StatusFilter,
    ) -> Result<u64>;

    /// Total amount of transactions matching `status_filter`
    async fn query_transaction_sum(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        status_filter: StatusFilter,
    ) -> Result<Decimal>;

    /// Number of completed transactions with exactly `amount`
    async fn query_same_amount_count(
        &self,
        user_id: &UserId,
        amount: Decimal,
        since: DateTime<Utc>,
    ) -> Result<u64>;

    /// Whether the user is known to the store
    async fn user_exists(&self, _user_id: &UserId) -> Result<bool> {
        Ok(true)
    }
}

/// Run a synchronous store scan on the blocking thread pool
///
/// The returned future stays pending while the scan runs, so a timeout
/// wrapped around a history query still fires when the disk is slow.
pub async fn run_blocking<T, F>(scan: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(scan)
        .await
        .map_err(|e| Error::Storage(format!("History scan task failed: {}", e)))?
}

/// Ordered, read-only view of one account's outgoing transactions
#[derive(Debug, Clone)]
pub struct TransactionWindow {
    user_id: UserId,
    since: DateTime<Utc>,
    transactions: Vec<Transaction>,
}

impl TransactionWindow {
    /// Build a window from any set of transactions
    ///
    /// Transactions not sent by `user_id` or older than `since` are dropped;
    /// the rest are ordered by timestamp, then ID.
    pub fn new(
        user_id: UserId,
        since: DateTime<Utc>,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> Self {
        let mut transactions: Vec<Transaction> = transactions
            .into_iter()
            .filter(|tx| tx.from_user_id == user_id && tx.timestamp >= since)
            .collect();
        transactions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        Self {
            user_id,
            since,
            transactions,
        }
    }

    /// Account this window belongs to
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Inclusive lower bound
    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }

    /// Transactions in timestamp order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of transactions in the window, any status
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the window holds no transactions
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Count transactions passing the filter
    pub fn count(&self, filter: StatusFilter) -> u64 {
        self.transactions
            .iter()
            .filter(|tx| filter.matches(tx.status))
            .count() as u64
    }

    /// Sum amounts of transactions passing the filter
    pub fn sum(&self, filter: StatusFilter) -> Decimal {
        self.transactions
            .iter()
            .filter(|tx| filter.matches(tx.status))
            .map(|tx| tx.amount)
            .sum()
    }

    /// Count completed transactions with exactly this amount
    pub fn same_amount_count(&self, amount: Decimal) -> u64 {
        self.transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed && tx.amount == amount)
            .count() as u64
    }
}
