//! Verification Reader
//!
//! Looks a vote up by hash or receipt token. Each query yields an
//! independent result; starting a new query discards the previous one, and
//! a query overtaken by a newer one never publishes.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::api::{ApiRequest, RequestPipeline};
use crate::error::{Error, Result};

use super::model::{VerificationResult, VerifyMode, MIN_TOKEN_LENGTH};

pub struct VerificationReader {
    api: RequestPipeline,
    latest: watch::Sender<Option<VerificationResult>>,
    generation: AtomicU64,
}

impl VerificationReader {
    pub fn new(api: RequestPipeline) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            api,
            latest,
            generation: AtomicU64::new(0),
        }
    }

    /// Verify a vote. Tokens failing [`validate_token`] are rejected without
    /// a backend call. `verified = false` is a normal result, not an error.
    pub async fn verify(&self, token: &str, mode: VerifyMode) -> Result<VerificationResult> {
        let token = validate_token(token)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest.send_replace(None);

        let request = match mode {
            VerifyMode::Hash => ApiRequest::get(["verification", "vote", token]),
            VerifyMode::Receipt => ApiRequest::get(["verification", "vote", "receipt", token]),
        };
        let result: VerificationResult = self.api.send_json(request).await?;

        tracing::debug!(
            "Verification by {}: verified={} consistent={}",
            mode,
            result.verified,
            result.blockchain_consistent
        );

        if self.generation.load(Ordering::SeqCst) == generation {
            self.latest.send_replace(Some(result.clone()));
        }
        Ok(result)
    }

    /// Result of the most recent query, if it completed and was not discarded
    pub fn latest(&self) -> Option<VerificationResult> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<VerificationResult>> {
        self.latest.subscribe()
    }

    /// Drop the current result and ignore any query still in flight
    pub fn discard(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.latest.send_replace(None);
    }
}

/// Trim a caller-supplied token and check its length
pub fn validate_token(token: &str) -> Result<&str> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::MalformedToken("token is required".to_string()));
    }
    if token.chars().count() < MIN_TOKEN_LENGTH {
        return Err(Error::MalformedToken(format!(
            "token must be at least {} characters",
            MIN_TOKEN_LENGTH
        )));
    }
    Ok(token)
}
