// Models module - Database entity representations

pub mod credential;
pub mod institution;
pub mod issuance_intent;
pub mod student;
pub mod verification_log;
pub mod wallet_nonce;

pub use credential::Credential;
pub use institution::Institution;
pub use issuance_intent::{IntentStatus, IssuanceIntent};
pub use student::Student;
pub use verification_log::VerificationLog;
pub use wallet_nonce::WalletNonce;
