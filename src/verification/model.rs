//! Verification data model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shortest token the lookup endpoints accept
pub const MIN_TOKEN_LENGTH: usize = 8;

/// Which lookup a token is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyMode {
    /// Vote hash printed on the vote receipt
    Hash,
    /// Voter-held receipt token
    Receipt,
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyMode::Hash => write!(f, "hash"),
            VerifyMode::Receipt => write!(f, "receipt"),
        }
    }
}

/// Result of one vote lookup. A fresh value per query; never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verified: bool,
    #[serde(default)]
    pub vote_hash: Option<String>,
    #[serde(default)]
    pub blockchain_transaction_id: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub vote_timestamp: Option<String>,
    pub verification_timestamp: String,
    #[serde(default)]
    pub merkle_proof: Option<String>,
    #[serde(default)]
    pub blockchain_consistent: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub election_id: Option<String>,
    #[serde(default)]
    pub election_name: Option<String>,
}

impl VerificationResult {
    pub fn outcome(&self) -> VerificationOutcome {
        match (self.verified, self.blockchain_consistent) {
            (true, true) => VerificationOutcome::Confirmed,
            (true, false) => VerificationOutcome::PendingConfirmation,
            (false, _) => VerificationOutcome::NotRecorded,
        }
    }
}

/// Display state of a verification result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Recorded and the ledger confirms it
    Confirmed,
    /// Recorded, ledger confirmation outstanding
    PendingConfirmation,
    /// No such vote on record
    NotRecorded,
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Confirmed => write!(f, "Vote verified"),
            VerificationOutcome::PendingConfirmation => write!(f, "Vote recorded, pending confirmation"),
            VerificationOutcome::NotRecorded => write!(f, "Vote not found"),
        }
    }
}

/// Ledger statistics for one election.
///
/// The backend serves an open key/value map; the well-known keys have
/// typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerStats(pub serde_json::Map<String, serde_json::Value>);

impl LedgerStats {
    pub fn election_id(&self) -> Option<&str> {
        self.0.get("electionId").and_then(|v| v.as_str())
    }

    pub fn chain_valid(&self) -> Option<bool> {
        self.0.get("chainValid").and_then(|v| v.as_bool())
    }

    pub fn block_count(&self) -> Option<u64> {
        self.0.get("blockCount").and_then(|v| v.as_u64())
    }

    pub fn total_transactions(&self) -> Option<u64> {
        self.0.get("totalTransactions").and_then(|v| v.as_u64())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}
