pub mod config;
pub mod error;
pub mod kyc;
pub mod pep;
pub mod sanctions;
pub mod sar;
pub mod screening;
pub mod types;

pub use config::AmlConfig;
pub use error::{ComplianceError, Result};
pub use kyc::{verify_kyc_documents, DocumentKind, KycDocument, KycStatus, KycVerification};
pub use pep::PepChecker;
pub use sanctions::{SanctionsEngine, SanctionsEntry, SanctionsMatch};
pub use sar::{SarGenerator, SarReport, SarStatus};
pub use screening::AmlFlagEvaluator;
pub use types::{
    AmlFlag, AmlRiskLevel, AmlScreening, AmlStatus, CheckStatus, ComplianceRecommendation,
    ScreeningType, TransactionRequest, UserProfile,
};
