//! Verification Module
//!
//! Vote lookups by hash or receipt token, and ledger statistics.

mod ledger;
mod model;
mod reader;

pub use ledger::LedgerClient;
pub use model::{
    LedgerStats, VerificationOutcome, VerificationResult, VerifyMode, MIN_TOKEN_LENGTH,
};
pub use reader::{validate_token, VerificationReader};
