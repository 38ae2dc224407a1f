//! KYC document verification
//!
//! Documents are checked for completeness only; the highest KYC level whose
//! requirement set is fully verified is granted.

use chrono::{DateTime, Duration, Utc};
use ledger_core::{KycLevel, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// How long an approval stays valid
pub const APPROVAL_VALIDITY_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    BasicInfo,
    GovernmentId,
    ProofOfAddress,
    SsnVerification,
    IncomeVerification,
    #[serde(other)]
    Unsupported,
}

impl DocumentKind {
    /// Fields a document of this kind must carry
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            DocumentKind::BasicInfo => &["full_name", "date_of_birth"],
            DocumentKind::GovernmentId => &["id_number", "expiry_date", "name", "address"],
            DocumentKind::ProofOfAddress => &["address", "issue_date"],
            DocumentKind::SsnVerification => &["ssn_last_4"],
            DocumentKind::IncomeVerification => &["employer", "annual_income"],
            DocumentKind::Unsupported => &[],
        }
    }

    fn confidence(&self) -> f64 {
        match self {
            DocumentKind::ProofOfAddress | DocumentKind::IncomeVerification => 0.90,
            _ => 0.95,
        }
    }
}

/// Documents each level needs, lowest level first
pub fn level_requirements(level: KycLevel) -> &'static [DocumentKind] {
    match level {
        KycLevel::Basic => &[DocumentKind::GovernmentId, DocumentKind::BasicInfo],
        KycLevel::Enhanced => &[
            DocumentKind::GovernmentId,
            DocumentKind::ProofOfAddress,
            DocumentKind::SsnVerification,
        ],
        KycLevel::Premium => &[
            DocumentKind::GovernmentId,
            DocumentKind::ProofOfAddress,
            DocumentKind::SsnVerification,
            DocumentKind::IncomeVerification,
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycDocument {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl KycDocument {
    pub fn new<I, K, V>(kind: DocumentKind, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind,
            data: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Approved,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedDocument {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub verified_at: DateTime<Utc>,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDocument {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub reason: String,
    pub required_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycVerification {
    pub verification_id: Uuid,
    pub user_id: UserId,
    pub status: KycStatus,
    pub level: KycLevel,
    pub documents_verified: Vec<VerifiedDocument>,
    pub documents_pending: Vec<PendingDocument>,
    pub issues: Vec<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl KycVerification {
    /// Approved and not yet expired at `at`
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.status == KycStatus::Approved && self.expires_at.map_or(false, |exp| at < exp)
    }
}

/// Check one document for completeness
pub fn verify_document(document: &KycDocument) -> std::result::Result<f64, PendingDocument> {
    let pending = |reason: String, required_actions: Vec<String>| PendingDocument {
        kind: document.kind,
        reason,
        required_actions,
    };

    match document.kind {
        DocumentKind::Unsupported => Err(pending("Unsupported document type".to_string(), vec![])),
        DocumentKind::SsnVerification => match document.data.get("ssn_last_4") {
            Some(last4) if last4.chars().count() == 4 => Ok(document.kind.confidence()),
            _ => Err(pending(
                "Invalid SSN format".to_string(),
                vec!["Provide ssn_last_4".to_string()],
            )),
        },
        kind => {
            let missing: Vec<&str> = kind
                .required_fields()
                .iter()
                .copied()
                .filter(|field| !document.data.contains_key(*field))
                .collect();

            if missing.is_empty() {
                Ok(kind.confidence())
            } else {
                Err(pending(
                    format!("Missing required fields: {}", missing.join(", ")),
                    missing.iter().map(|f| format!("Provide {}", f)).collect(),
                ))
            }
        }
    }
}

/// Verify a set of documents and grant the highest satisfied level
pub fn verify_kyc_documents(
    user_id: &UserId,
    documents: &[KycDocument],
    at: DateTime<Utc>,
) -> KycVerification {
    let mut documents_verified = Vec::new();
    let mut documents_pending = Vec::new();
    let mut issues = Vec::new();

    for document in documents {
        match verify_document(document) {
            Ok(confidence_score) => documents_verified.push(VerifiedDocument {
                kind: document.kind,
                verified_at: at,
                confidence_score,
            }),
            Err(pending) => {
                issues.push(pending.reason.clone());
                documents_pending.push(pending);
            }
        }
    }

    let granted = KycLevel::ALL.iter().rev().copied().find(|level| {
        level_requirements(*level)
            .iter()
            .all(|req| documents_verified.iter().any(|d| d.kind == *req))
    });

    let (status, level, verified_at, expires_at) = match granted {
        Some(level) => (
            KycStatus::Approved,
            level,
            Some(at),
            Some(at + Duration::days(APPROVAL_VALIDITY_DAYS)),
        ),
        None => (KycStatus::Pending, KycLevel::Basic, None, None),
    };

    info!(
        user_id = %user_id,
        status = ?status,
        level = %level,
        verified = documents_verified.len(),
        pending = documents_pending.len(),
        "KYC verification completed"
    );

    KycVerification {
        verification_id: Uuid::new_v4(),
        user_id: user_id.clone(),
        status,
        level,
        documents_verified,
        documents_pending,
        issues,
        verified_at,
        expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn government_id() -> KycDocument {
        KycDocument::new(
            DocumentKind::GovernmentId,
            [
                ("id_number", "X123"),
                ("expiry_date", "2030-01-01"),
                ("name", "Ana Ruiz"),
                ("address", "1 Calle Luna"),
            ],
        )
    }

    fn proof_of_address() -> KycDocument {
        KycDocument::new(
            DocumentKind::ProofOfAddress,
            [("address", "1 Calle Luna"), ("issue_date", "2024-05-01")],
        )
    }

    fn ssn(last4: &str) -> KycDocument {
        KycDocument::new(DocumentKind::SsnVerification, [("ssn_last_4", last4)])
    }

    #[test]
    fn test_missing_fields_reported() {
        let doc = KycDocument::new(DocumentKind::GovernmentId, [("id_number", "X123")]);
        let pending = verify_document(&doc).unwrap_err();

        assert_eq!(
            pending.reason,
            "Missing required fields: expiry_date, name, address"
        );
        assert_eq!(pending.required_actions.len(), 3);
    }

    #[test]
    fn test_enhanced_level_granted() {
        let user = UserId::new("ana");
        let result = verify_kyc_documents(&user, &[government_id(), proof_of_address(), ssn("1234")], at());

        assert_eq!(result.status, KycStatus::Approved);
        assert_eq!(result.level, KycLevel::Enhanced);
        assert_eq!(result.expires_at, Some(at() + Duration::days(365)));
        assert!(result.is_valid_at(at() + Duration::days(364)));
        assert!(!result.is_valid_at(at() + Duration::days(365)));
    }

    #[test]
    fn test_premium_needs_income() {
        let income = KycDocument::new(
            DocumentKind::IncomeVerification,
            [("employer", "DalePay"), ("annual_income", "85000")],
        );
        let result = verify_kyc_documents(
            &UserId::new("ana"),
            &[government_id(), proof_of_address(), ssn("1234"), income],
            at(),
        );

        assert_eq!(result.level, KycLevel::Premium);
    }

    #[test]
    fn test_bad_ssn_leaves_pending() {
        let result = verify_kyc_documents(
            &UserId::new("ana"),
            &[government_id(), proof_of_address(), ssn("123")],
            at(),
        );

        assert_eq!(result.status, KycStatus::Pending);
        assert_eq!(result.level, KycLevel::Basic);
        assert_eq!(result.issues, vec!["Invalid SSN format".to_string()]);
        assert!(result.expires_at.is_none());
        assert!(!result.is_valid_at(at()));
    }

    #[test]
    fn test_basic_level() {
        let basic_info = KycDocument::new(
            DocumentKind::BasicInfo,
            [("full_name", "Ana Ruiz"), ("date_of_birth", "1990-02-03")],
        );
        let result = verify_kyc_documents(&UserId::new("ana"), &[government_id(), basic_info], at());

        assert_eq!(result.status, KycStatus::Approved);
        assert_eq!(result.level, KycLevel::Basic);
    }

    #[test]
    fn test_unknown_document_type() {
        let doc: KycDocument =
            serde_json::from_str(r#"{"type": "utility_bill", "data": {"address": "x"}}"#).unwrap();
        assert_eq!(doc.kind, DocumentKind::Unsupported);
        assert_eq!(
            verify_document(&doc).unwrap_err().reason,
            "Unsupported document type"
        );
    }
}
