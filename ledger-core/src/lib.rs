//! DalePay Ledger Core
//!
//! Wallet transaction history and the read-only query interface consumed by
//! the risk and compliance evaluators.
//!
//! # Architecture
//!
//! - **History trait**: [`TransactionHistory`] is the only seam the scoring
//!   code depends on; it never sees a concrete store
//! - **Windows**: queries are answered from a [`TransactionWindow`], an ordered
//!   read-only slice of one account's history
//! - **Stores**: [`MemoryLedger`] for tests and single-process deployments,
//!   [`RocksLedger`] for persistent history
//!
//! # Invariants
//!
//! - Completed transactions are immutable
//! - Queries count only `completed` transactions unless a filter says otherwise
//! - Amounts are exact decimals, never floats

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod history;
pub mod memory;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use history::{run_blocking, TransactionHistory, TransactionWindow};
pub use memory::MemoryLedger;
pub use storage::RocksLedger;
pub use types::{KycLevel, StatusFilter, Transaction, TransactionStatus, UserId};
