//! Persistent transaction history using RocksDB
//!
//! # Column Families
//!
//! - `transactions` - Transaction records (key: transaction_id)
//! - `user_index` - Per-sender time index (key: user || timestamp || transaction_id)
//! - `users` - Known users (key: user_id)
//!
//! Index timestamps are microseconds with the sign bit flipped, stored
//! big-endian, so a forward scan from `user || since` walks the user's
//! history in time order.
//!
//! History queries run on the blocking thread pool. Writes that read before
//! they write (`record`, `update_status`) hold the store's write lock.

use crate::{
    error::{Error, Result},
    history::{run_blocking, TransactionHistory, TransactionWindow},
    types::{StatusFilter, Transaction, TransactionStatus, UserId},
    Config,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use rust_decimal::Decimal;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Column family names
const CF_TRANSACTIONS: &str = "transactions";
const CF_USER_INDEX: &str = "user_index";
const CF_USERS: &str = "users";

/// RocksDB-backed transaction history
#[derive(Clone)]
pub struct RocksLedger {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
    path: PathBuf,
}

impl fmt::Debug for RocksLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksLedger").field("path", &self.path).finish()
    }
}

impl RocksLedger {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(
                CF_USER_INDEX,
                Self::cf_options_index(config.rocksdb.index_bloom_bits),
            ),
            ColumnFamilyDescriptor::new(CF_USERS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened transaction history store");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
            path: path.clone(),
        })
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_index(bloom_bits: f64) -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(bloom_bits, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn write_guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::Storage("Write lock poisoned".to_string()))
    }

    /// Register a user with no history yet
    pub fn register_user(&self, user_id: &UserId) -> Result<()> {
        let cf = self.cf_handle(CF_USERS)?;
        self.db.put_cf(cf, user_id.as_str().as_bytes(), b"")?;
        Ok(())
    }

    /// Record a transaction with its index entry (atomic)
    pub fn record(&self, transaction: &Transaction) -> Result<()> {
        transaction.validate()?;

        let _guard = self.write_guard()?;
        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        if self
            .db
            .get_pinned_cf(cf_transactions, transaction.id.as_bytes())?
            .is_some()
        {
            return Err(Error::InvalidTransaction(format!(
                "Duplicate transaction ID {}",
                transaction.id
            )));
        }

        let cf_index = self.cf_handle(CF_USER_INDEX)?;
        let cf_users = self.cf_handle(CF_USERS)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            cf_transactions,
            transaction.id.as_bytes(),
            bincode::serialize(transaction)?,
        );
        batch.put_cf(
            cf_index,
            Self::index_key(&transaction.from_user_id, transaction.timestamp, Some(transaction.id)),
            b"",
        );
        batch.put_cf(cf_users, transaction.from_user_id.as_str().as_bytes(), b"");
        batch.put_cf(cf_users, transaction.to_user_id.as_str().as_bytes(), b"");
        self.db.write(batch)?;

        tracing::debug!(
            transaction_id = %transaction.id,
            from = %transaction.from_user_id,
            amount = %transaction.amount,
            "Transaction persisted"
        );

        Ok(())
    }

    /// Get transaction by ID
    pub fn get(&self, transaction_id: Uuid) -> Result<Transaction> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let value = self
            .db
            .get_cf(cf, transaction_id.as_bytes())?
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;

        Ok(bincode::deserialize(&value)?)
    }

    /// Move a transaction to a new status
    ///
    /// Completed transactions are immutable.
    pub fn update_status(&self, transaction_id: Uuid, status: TransactionStatus) -> Result<()> {
        let _guard = self.write_guard()?;
        let mut transaction = self.get(transaction_id)?;
        if transaction.status == TransactionStatus::Completed {
            return Err(Error::ImmutableTransaction(transaction_id.to_string()));
        }

        transaction.status = status;
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        self.db
            .put_cf(cf, transaction_id.as_bytes(), bincode::serialize(&transaction)?)?;
        Ok(())
    }

    /// Outgoing history of one user since `since`
    pub fn window(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<TransactionWindow> {
        let cf_index = self.cf_handle(CF_USER_INDEX)?;
        let prefix = Self::user_prefix(user_id);
        let start = Self::index_key(user_id, since, None);

        let mut transactions = Vec::new();
        for item in self
            .db
            .iterator_cf(cf_index, IteratorMode::From(&start, Direction::Forward))
        {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            let id_bytes: [u8; 16] = key[key.len() - 16..]
                .try_into()
                .map_err(|_| Error::Storage("Malformed user index key".to_string()))?;
            transactions.push(self.get(Uuid::from_bytes(id_bytes))?);
        }

        Ok(TransactionWindow::new(user_id.clone(), since, transactions))
    }

    /// Every user's transactions since `since`, oldest first
    pub fn transactions_since(&self, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let mut transactions = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let transaction: Transaction = bincode::deserialize(&value)?;
            if transaction.timestamp >= since {
                transactions.push(transaction);
            }
        }
        transactions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        Ok(transactions)
    }

    async fn scan_window(&self, user_id: &UserId, since: DateTime<Utc>) -> Result<TransactionWindow> {
        let ledger = self.clone();
        let user_id = user_id.clone();
        run_blocking(move || ledger.window(&user_id, since)).await
    }

    fn is_known(&self, user_id: &UserId) -> Result<bool> {
        let cf = self.cf_handle(CF_USERS)?;
        Ok(self.db.get_pinned_cf(cf, user_id.as_str().as_bytes())?.is_some())
    }

    // Index key helpers

    fn user_prefix(user_id: &UserId) -> Vec<u8> {
        let user = user_id.as_str().as_bytes();
        let mut key = Vec::with_capacity(2 + user.len() + 24);
        key.extend_from_slice(&(user.len() as u16).to_be_bytes());
        key.extend_from_slice(user);
        key
    }

    fn index_key(user_id: &UserId, timestamp: DateTime<Utc>, id: Option<Uuid>) -> Vec<u8> {
        let mut key = Self::user_prefix(user_id);
        let ordered = (timestamp.timestamp_micros() as u64) ^ (1 << 63);
        key.extend_from_slice(&ordered.to_be_bytes());
        if let Some(id) = id {
            key.extend_from_slice(id.as_bytes());
        }
        key
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("Transaction history store closed");
        Ok(())
    }
}

#[async_trait]
impl TransactionHistory for RocksLedger {
    async fn query_transaction_count(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        status_filter: StatusFilter,
    ) -> Result<u64> {
        Ok(self.scan_window(user_id, since).await?.count(status_filter))
    }

    async fn query_transaction_sum(
        &self,
        user_id: &UserId,
        since: DateTime<Utc>,
        status_filter: StatusFilter,
    ) -> Result<Decimal> {
        Ok(self.scan_window(user_id, since).await?.sum(status_filter))
    }

    async fn query_same_amount_count(
        &self,
        user_id: &UserId,
        amount: Decimal,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        Ok(self.scan_window(user_id, since).await?.same_amount_count(amount))
    }

    async fn user_exists(&self, user_id: &UserId) -> Result<bool> {
        let ledger = self.clone();
        let user_id = user_id.clone();
        run_blocking(move || ledger.is_known(&user_id)).await
    }
}
