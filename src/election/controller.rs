//! Election Lifecycle Controller
//!
//! Holds the snapshot of one election and drives its lifecycle:
//!
//! ```text
//! CREATED -> CANDIDATES_IMPORTED -> STARTED -> CLOSED -> RESULTS_PUBLISHED
//! ```
//!
//! Every successful transition replaces the snapshot wholesale. Entering
//! `STARTED` or `CLOSED` schedules a ledger statistics fetch in the
//! background. The snapshot never moves backwards.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::verification::{LedgerClient, LedgerStats};

use super::model::{Election, ElectionStatus, LifecycleAction};
use super::service::ElectionService;

pub struct LifecycleController {
    election_id: String,
    elections: ElectionService,
    ledger: LedgerClient,
    snapshot: watch::Sender<Option<Arc<Election>>>,
    ledger_stats: Arc<watch::Sender<Option<LedgerStats>>>,
    /// Outstanding ledger statistics fetch
    stats_task: Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleController {
    pub fn new(election_id: impl Into<String>, elections: ElectionService, ledger: LedgerClient) -> Self {
        let (snapshot, _) = watch::channel(None);
        let (ledger_stats, _) = watch::channel(None);

        Self {
            election_id: election_id.into(),
            elections,
            ledger,
            snapshot,
            ledger_stats: Arc::new(ledger_stats),
            stats_task: Mutex::new(None),
        }
    }

    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    /// Fetch the election and take it as the new snapshot
    pub async fn load(&self) -> Result<Arc<Election>> {
        let election = self.elections.get(&self.election_id).await?;
        self.replace_snapshot(election).await
    }

    pub async fn import_candidates(&self, data_source_url: Option<&str>) -> Result<Arc<Election>> {
        self.apply(LifecycleAction::ImportCandidates, data_source_url)
            .await
    }

    pub async fn start_election(&self) -> Result<Arc<Election>> {
        self.apply(LifecycleAction::Start, None).await
    }

    pub async fn close_election(&self) -> Result<Arc<Election>> {
        self.apply(LifecycleAction::Close, None).await
    }

    /// Current snapshot, if one has been loaded
    pub fn snapshot(&self) -> Option<Arc<Election>> {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> Option<ElectionStatus> {
        self.snapshot.borrow().as_ref().map(|e| e.status)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Election>>> {
        self.snapshot.subscribe()
    }

    /// Most recently fetched ledger statistics
    pub fn ledger_stats(&self) -> Option<LedgerStats> {
        self.ledger_stats.borrow().clone()
    }

    pub fn subscribe_ledger(&self) -> watch::Receiver<Option<LedgerStats>> {
        self.ledger_stats.subscribe()
    }

    /// Wait for the scheduled statistics fetch, if any, then read the result
    pub async fn wait_for_ledger_stats(&self) -> Option<LedgerStats> {
        let pending = self.stats_task.lock().await.take();
        if let Some(handle) = pending {
            let _ = handle.await;
        }
        self.ledger_stats()
    }

    async fn apply(&self, action: LifecycleAction, data_source_url: Option<&str>) -> Result<Arc<Election>> {
        // The backend decides; a mismatch here is only worth a note
        if let Some(status) = self.status() {
            if !status.permits(action) {
                tracing::debug!(
                    "Election {}: {} requested from {}, expecting rejection",
                    self.election_id,
                    action,
                    status
                );
            }
        }

        let election = self
            .elections
            .transition(&self.election_id, action, data_source_url)
            .await?;
        self.replace_snapshot(election).await
    }

    async fn replace_snapshot(&self, election: Election) -> Result<Arc<Election>> {
        if election.id != self.election_id {
            return Err(Error::Internal(format!(
                "Expected election {}, backend returned {}",
                self.election_id, election.id
            )));
        }

        let election = Arc::new(election);
        let mut regressed_from = None;
        self.snapshot.send_if_modified(|held| match held {
            Some(current) if election.status < current.status => {
                regressed_from = Some(current.status);
                false
            }
            _ => {
                *held = Some(Arc::clone(&election));
                true
            }
        });

        if let Some(current) = regressed_from {
            tracing::warn!(
                "Election {}: ignoring {} snapshot, already {}",
                self.election_id,
                election.status,
                current
            );
            return Err(Error::InvalidTransition(format!(
                "Election status cannot move from {} back to {}",
                current, election.status
            )));
        }

        if election.status.has_ledger() {
            self.schedule_ledger_stats().await;
        }
        Ok(election)
    }

    async fn schedule_ledger_stats(&self) {
        let ledger = self.ledger.clone();
        let sink = Arc::clone(&self.ledger_stats);
        let election_id = self.election_id.clone();

        let handle = tokio::spawn(async move {
            match ledger.stats(&election_id).await {
                Ok(stats) => {
                    sink.send_replace(Some(stats));
                }
                Err(e) => {
                    tracing::warn!("Failed to load ledger stats for election {}: {}", election_id, e);
                }
            }
        });

        if let Some(previous) = self.stats_task.lock().await.replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if let Some(handle) = self.stats_task.get_mut().take() {
            handle.abort();
        }
    }
}
