//! Admin Client
//!
//! Wires the session, the request pipeline and the election and
//! verification components together. One instance per process; clone the
//! parts out of it as needed.

use std::sync::Arc;

use crate::api::{HttpTransport, RequestPipeline, Transport};
use crate::config::VotectlConfig;
use crate::election::{ElectionService, LifecycleController};
use crate::error::Result;
use crate::session::{SessionManager, TokenStore};
use crate::verification::{LedgerClient, VerificationReader};

#[derive(Clone)]
pub struct AdminClient {
    session: SessionManager,
    api: RequestPipeline,
}

impl AdminClient {
    /// Connect to the configured backend and restore any persisted session
    pub async fn open(config: &VotectlConfig) -> Result<Self> {
        config.validate()?;

        let transport = Arc::new(HttpTransport::from_config(&config.api)?);
        let store = TokenStore::open(config.session.data_dir.clone())?;

        tracing::debug!(
            "Using backend {} with session data in {:?}",
            config.api.base_url,
            config.session.data_dir
        );
        Self::with_transport(store, transport).await
    }

    /// Build a client over an explicit store and transport
    pub async fn with_transport(store: TokenStore, transport: Arc<dyn Transport>) -> Result<Self> {
        let session = SessionManager::open(store, Arc::clone(&transport)).await?;
        let api = RequestPipeline::new(transport, session.clone());
        Ok(Self { session, api })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn api(&self) -> &RequestPipeline {
        &self.api
    }

    pub fn elections(&self) -> ElectionService {
        ElectionService::new(self.api.clone())
    }

    pub fn ledger(&self) -> LedgerClient {
        LedgerClient::new(self.api.clone())
    }

    /// Controller bound to one election; call `load` before reading its snapshot
    pub fn lifecycle(&self, election_id: impl Into<String>) -> LifecycleController {
        LifecycleController::new(election_id, self.elections(), self.ledger())
    }

    /// A fresh reader; each view keeps its own
    pub fn verifier(&self) -> VerificationReader {
        VerificationReader::new(self.api.clone())
    }
}
