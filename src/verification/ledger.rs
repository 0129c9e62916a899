//! Ledger statistics client

use crate::api::{ApiRequest, RequestPipeline};
use crate::error::Result;

use super::model::LedgerStats;

/// Read-only access to `/verification/blockchain/{id}`
#[derive(Clone)]
pub struct LedgerClient {
    api: RequestPipeline,
}

impl LedgerClient {
    pub fn new(api: RequestPipeline) -> Self {
        Self { api }
    }

    pub async fn stats(&self, election_id: &str) -> Result<LedgerStats> {
        self.api
            .send_json(ApiRequest::get(["verification", "blockchain", election_id, "stats"]))
            .await
    }

    /// Run a full chain validation on the backend
    pub async fn validate(&self, election_id: &str) -> Result<LedgerStats> {
        let stats: LedgerStats = self
            .api
            .send_json(ApiRequest::get(["verification", "blockchain", election_id, "validate"]))
            .await?;

        if stats.chain_valid() == Some(false) {
            tracing::warn!("Ledger for election {} failed validation", election_id);
        }
        Ok(stats)
    }
}
