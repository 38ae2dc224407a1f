//! Suspicious Activity Report drafting
//!
//! Builds a draft SAR from a subject and the transactions that triggered it,
//! and exports it as JSON (full report) or CSV (transaction listing).

use crate::error::{ComplianceError, Result};
use crate::types::UserProfile;
use chrono::{DateTime, Utc};
use ledger_core::Transaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Report status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SarStatus {
    Draft,
    Filed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilerInfo {
    pub name: String,
    pub fincen_id: String,
    pub address: String,
}

impl Default for FilerInfo {
    fn default() -> Self {
        Self {
            name: "DalePay Financial Services".to_string(),
            fincen_id: "31000123456789".to_string(),
            address: "San Juan, Puerto Rico".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectInfo {
    pub name: String,
    pub phone: Option<String>,
    /// Masked identification, e.g. `SSN: ***-**-1234`
    pub identification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivitySummary {
    pub activity_type: String,
    pub total_amount: Decimal,
    pub transaction_count: u64,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SarReport {
    pub sar_id: Uuid,
    pub filing_date: DateTime<Utc>,
    pub subject_type: String,
    pub filer_info: FilerInfo,
    pub subject_info: SubjectInfo,
    pub suspicious_activity: ActivitySummary,
    pub transaction_ids: Vec<Uuid>,
    pub narrative: String,
    pub status: SarStatus,
}

impl SarReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ComplianceError::Export(e.to_string()))
    }

    /// File name: `SAR_<yyyymmdd>_<first 8 of id>.<ext>`
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "SAR_{}_{}.{}",
            self.filing_date.format("%Y%m%d"),
            &self.sar_id.to_string()[..8],
            extension
        )
    }
}

/// SAR generator
#[derive(Debug, Clone, Default)]
pub struct SarGenerator {
    filer: FilerInfo,
}

impl SarGenerator {
    pub fn new(filer: FilerInfo) -> Self {
        Self { filer }
    }

    /// Draft a report; `transactions` must not be empty
    pub fn generate(
        &self,
        subject: &UserProfile,
        transactions: &[Transaction],
        filing_date: DateTime<Utc>,
    ) -> Result<SarReport> {
        let start = transactions.iter().map(|t| t.timestamp).min();
        let end = transactions.iter().map(|t| t.timestamp).max();
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(ComplianceError::InvalidInput(
                    "A SAR needs at least one transaction".to_string(),
                ))
            }
        };

        let total_amount: Decimal = transactions.iter().map(|t| t.amount).sum();
        let identification = format!(
            "SSN: ***-**-{}",
            subject.ssn_last_4.as_deref().unwrap_or("XXXX")
        );

        let report = SarReport {
            sar_id: Uuid::new_v4(),
            filing_date,
            subject_type: "individual".to_string(),
            filer_info: self.filer.clone(),
            subject_info: SubjectInfo {
                name: subject.full_name.clone(),
                phone: subject.phone.clone(),
                identification,
            },
            suspicious_activity: ActivitySummary {
                activity_type: "Unusual transaction patterns".to_string(),
                total_amount,
                transaction_count: transactions.len() as u64,
                date_range: DateRange { start, end },
            },
            transaction_ids: transactions.iter().map(|t| t.id).collect(),
            narrative: narrative(&subject.full_name, transactions.len(), total_amount),
            status: SarStatus::Draft,
        };

        info!(
            sar_id = %report.sar_id,
            user_id = %subject.user_id,
            transaction_count = transactions.len(),
            "SAR drafted"
        );

        Ok(report)
    }

    /// Write the report as pretty JSON into `dir`
    pub fn write_json(&self, report: &SarReport, dir: impl AsRef<Path>) -> Result<PathBuf> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(report.file_name("json"));
        std::fs::write(&path, report.to_json()?.as_bytes())?;
        Ok(path)
    }

    /// Write the supporting transactions as CSV into `dir`
    pub fn write_transactions_csv(
        &self,
        report: &SarReport,
        transactions: &[Transaction],
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(report.file_name("csv"));

        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| ComplianceError::Export(e.to_string()))?;
        writer
            .write_record(["id", "from_user_id", "to_user_id", "amount", "timestamp", "status"])
            .map_err(|e| ComplianceError::Export(e.to_string()))?;
        for tx in transactions {
            writer
                .write_record([
                    tx.id.to_string(),
                    tx.from_user_id.to_string(),
                    tx.to_user_id.to_string(),
                    tx.amount.to_string(),
                    tx.timestamp.to_rfc3339(),
                    tx.status.as_str().to_string(),
                ])
                .map_err(|e| ComplianceError::Export(e.to_string()))?;
        }
        writer.flush()?;

        Ok(path)
    }
}

fn narrative(subject: &str, count: usize, total: Decimal) -> String {
    let mut total = total.round_dp(2);
    total.rescale(2);
    format!(
        "Subject {} conducted {} transactions totaling ${} over a period that exhibited \
         unusual patterns inconsistent with normal customer behavior. The transactions were \
         flagged by automated monitoring for high velocity, unusual amount patterns and \
         potential structuring.",
        subject, count, total
    )
}
