//! Session Manager
//!
//! Owns login, refresh and logout against the auth endpoints and keeps the
//! persisted and in-memory session in step. At most one refresh is in flight
//! at any time; every caller arriving while it runs awaits the same outcome.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::json;
use tokio::sync::{broadcast, watch, Mutex};

use super::model::{AdminRole, AdminUser, AuthResponse, Session};
use super::store::TokenStore;
use crate::api::{ApiRequest, ApiResponse, Transport};
use crate::error::{Error, Result};

const LOGIN_PATH: [&str; 3] = ["admin", "auth", "login"];
const REFRESH_PATH: [&str; 3] = ["admin", "auth", "refresh"];

const DEFAULT_LOGIN_FAILURE: &str = "Invalid email or password";
const DEFAULT_REFRESH_FAILURE: &str = "Refresh token expired";

type RefreshFuture = Shared<BoxFuture<'static, Result<Session>>>;

/// Session change notifications for the view layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn(AdminUser),
    Refreshed,
    /// Explicit logout
    LoggedOut,
    /// Forced logout after an irrecoverable refresh failure; views route to login
    Expired,
}

/// Injectable session owner, cheap to clone
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: TokenStore,
    transport: Arc<dyn Transport>,
    state: watch::Sender<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    /// Serializes every store write with its publication
    writes: Mutex<()>,
    refresh_slot: Mutex<RefreshSlot>,
}

/// The outstanding refresh, if any, and the refresh token it was issued with
#[derive(Default)]
struct RefreshSlot {
    generation: u64,
    token: Option<String>,
    pending: Option<RefreshFuture>,
}

impl SessionManager {
    /// Create a manager, restoring any session persisted by a previous run
    pub async fn open(store: TokenStore, transport: Arc<dyn Transport>) -> Result<Self> {
        let restored = store.load().await?;
        if let Some(session) = &restored {
            tracing::info!("Restored session for {} ({})", session.user.email, session.user.role);
        }

        let (state, _) = watch::channel(restored);
        let (events, _) = broadcast::channel(32);

        Ok(Self {
            inner: Arc::new(Inner {
                store,
                transport,
                state,
                events,
                writes: Mutex::new(()),
                refresh_slot: Mutex::new(RefreshSlot::default()),
            }),
        })
    }

    /// Authenticate and publish the new session.
    ///
    /// A rejection from the backend is returned as [`Error::InvalidCredentials`]
    /// carrying the backend's message unchanged.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let request = ApiRequest::post(LOGIN_PATH)
            .with_json(json!({ "email": email, "password": password }));
        let response = self.inner.transport.execute(request).await?;

        if is_rejection(&response) {
            let message = response
                .error_message()
                .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string());
            tracing::warn!("Login rejected for {}: {}", email, message);
            return Err(Error::InvalidCredentials(message));
        }
        if !response.is_success() {
            return Err(response.into_error());
        }

        let session = response
            .json::<AuthResponse>()?
            .into_session()
            .map_err(Error::InvalidCredentials)?;

        let user = session.user.clone();
        self.inner
            .commit(session.clone(), SessionEvent::LoggedIn(user))
            .await?;

        tracing::info!("Logged in as {} ({})", session.user.email, session.user.role);
        Ok(session)
    }

    /// Exchange the stored refresh token for a new session.
    ///
    /// Concurrent callers share one backend call. The call runs on its own
    /// task, so dropping one waiter does not cancel it for the others. A call
    /// that settled with nobody waiting is never handed to a later caller.
    pub async fn refresh(&self) -> Result<Session> {
        let current_token = self.refresh_token();
        let pending = {
            let mut slot = self.inner.refresh_slot.lock().await;
            match slot.pending.clone() {
                Some(pending) if pending.peek().is_none() && slot.token == current_token => pending,
                _ => {
                    tracing::debug!("Starting token refresh");
                    slot.generation += 1;
                    let generation = slot.generation;
                    let inner = Arc::clone(&self.inner);
                    let token = current_token.clone();
                    let handle = tokio::spawn(async move {
                        let outcome = inner.perform_refresh(token).await;
                        inner.release_refresh(generation).await;
                        outcome
                    });
                    let pending = async move {
                        handle.await.unwrap_or_else(|e| {
                            Err(Error::Internal(format!("Refresh task failed: {}", e)))
                        })
                    }
                    .boxed()
                    .shared();
                    slot.token = current_token;
                    slot.pending = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Clear the session. Never fails and may be called any number of times.
    pub async fn logout(&self) {
        if self.inner.clear(SessionEvent::LoggedOut).await {
            tracing::info!("Logged out");
        }
    }

    /// Forced teardown after the pipeline gave up on a request
    pub(crate) async fn expire(&self) {
        if self.inner.clear(SessionEvent::Expired).await {
            tracing::warn!("Session expired, login required");
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AdminUser> {
        self.inner.state.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    pub fn has_role(&self, role: AdminRole) -> bool {
        self.inner
            .state
            .borrow()
            .as_ref()
            .map_or(false, |s| s.user.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(AdminRole::Admin)
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.state.borrow().as_ref().map(|s| s.refresh_token.clone())
    }

    /// Access token to attach to the next request
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().as_ref().map(|s| s.access_token.clone())
    }

    /// Watch the current session
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.state.subscribe()
    }

    /// Receive login, refresh and logout notifications
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}

impl Inner {
    /// Persist then publish. A failed write leaves the in-memory session untouched.
    async fn commit(&self, session: Session, event: SessionEvent) -> Result<()> {
        let _guard = self.writes.lock().await;
        self.store.save(&session).await?;
        self.state.send_replace(Some(session));
        let _ = self.events.send(event);
        Ok(())
    }

    /// Returns whether a session was actually torn down
    async fn clear(&self, event: SessionEvent) -> bool {
        let _guard = self.writes.lock().await;
        if let Err(e) = self.store.clear().await {
            tracing::error!("Failed to clear persisted session: {}", e);
        }
        let previous = self.state.send_replace(None);
        if previous.is_some() {
            let _ = self.events.send(event);
        }
        previous.is_some()
    }

    async fn perform_refresh(&self, refresh_token: Option<String>) -> Result<Session> {
        let Some(refresh_token) = refresh_token else {
            return Err(Error::RefreshExpired("No refresh token available".to_string()));
        };

        let request = ApiRequest::post(REFRESH_PATH).with_bearer(refresh_token.clone());
        let response = self.transport.execute(request).await?;

        let outcome = if is_rejection(&response) {
            Err(response
                .error_message()
                .unwrap_or_else(|| DEFAULT_REFRESH_FAILURE.to_string()))
        } else if response.is_success() {
            response.json::<AuthResponse>()?.into_session()
        } else {
            return Err(response.into_error());
        };

        self.settle_refresh(&refresh_token, outcome).await
    }

    /// Free the slot once its refresh has settled, whether or not anyone awaited it
    async fn release_refresh(&self, generation: u64) {
        let mut slot = self.refresh_slot.lock().await;
        if slot.generation == generation {
            slot.token = None;
            slot.pending = None;
        }
    }

    /// Apply a refresh outcome, unless the session it was issued for has
    /// since been replaced or cleared.
    async fn settle_refresh(
        &self,
        used_token: &str,
        outcome: std::result::Result<Session, String>,
    ) -> Result<Session> {
        let _guard = self.writes.lock().await;
        let current = self.state.borrow().clone();

        match current {
            Some(current) if current.refresh_token == used_token => match outcome {
                Ok(session) => {
                    self.store.save(&session).await?;
                    self.state.send_replace(Some(session.clone()));
                    let _ = self.events.send(SessionEvent::Refreshed);
                    tracing::debug!("Access token refreshed for {}", session.user.email);
                    Ok(session)
                }
                Err(message) => {
                    tracing::warn!("Refresh rejected: {}", message);
                    if let Err(e) = self.store.clear().await {
                        tracing::error!("Failed to clear persisted session: {}", e);
                    }
                    self.state.send_replace(None);
                    let _ = self.events.send(SessionEvent::Expired);
                    Err(Error::RefreshExpired(message))
                }
            },
            Some(current) => {
                tracing::debug!("Session replaced during refresh, keeping the newer one");
                Ok(current)
            }
            None => Err(Error::RefreshExpired("Session ended during refresh".to_string())),
        }
    }
}

/// Auth endpoints answer bad credentials with one of these
fn is_rejection(response: &ApiResponse) -> bool {
    matches!(response.status, 400 | 401 | 403)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{auth_body, respond, seeded_session, session_fixture, ScriptedTransport};
    use std::time::Duration;
    use tempfile::tempdir;

    fn refresh_ok() -> Arc<ScriptedTransport> {
        ScriptedTransport::with_delay(Duration::from_millis(50), |req| match req.path().as_str() {
            "/admin/auth/refresh" => respond(200, auth_body("access-2", "refresh-2", "ELECTION_OFFICIAL")),
            _ => respond(404, json!({ "message": "no route" })),
        })
    }

    #[tokio::test]
    async fn test_login_persists_and_restores() {
        let dir = tempdir().unwrap();
        let transport = ScriptedTransport::new(|req| {
            assert_eq!(req.path(), "/admin/auth/login");
            assert!(req.bearer.is_none());
            assert_eq!(req.body.as_ref().unwrap()["email"], "official@cec.example");
            respond(200, auth_body("access-1", "refresh-1", "ELECTION_OFFICIAL"))
        });

        let manager = SessionManager::open(
            TokenStore::open(dir.path().to_path_buf()).unwrap(),
            transport.clone(),
        )
        .await
        .unwrap();
        let mut events = manager.events();

        let session = manager.login("official@cec.example", "s3cret").await.unwrap();
        assert_eq!(session.access_token, "access-1");
        assert!(manager.is_authenticated());
        assert!(manager.has_role(AdminRole::ElectionOfficial));
        assert!(!manager.is_admin());
        assert!(matches!(events.try_recv().unwrap(), SessionEvent::LoggedIn(_)));
        drop(manager);

        // A fresh manager over the same directory picks the session back up
        let restored = SessionManager::open(
            TokenStore::open(dir.path().to_path_buf()).unwrap(),
            transport.clone(),
        )
        .await
        .unwrap();
        assert_eq!(restored.access_token().as_deref(), Some("access-1"));
        assert_eq!(restored.current_user().unwrap().full_name, "Arta Hoxha");
        assert_eq!(transport.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_backend_message() {
        let transport = ScriptedTransport::new(|_| {
            respond(401, json!({ "status": 401, "error": "Unauthorized", "message": "Account is locked" }))
        });
        let manager = SessionManager::open(TokenStore::in_memory().unwrap(), transport)
            .await
            .unwrap();

        let err = manager.login("official@cec.example", "wrong").await.unwrap_err();
        assert_eq!(err, Error::InvalidCredentials("Account is locked".to_string()));
        assert!(!manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_failure_body_without_message() {
        let transport = ScriptedTransport::new(|_| respond(400, json!({})));
        let manager = SessionManager::open(TokenStore::in_memory().unwrap(), transport)
            .await
            .unwrap();

        let err = manager.login("a@b.c", "x").await.unwrap_err();
        assert_eq!(err, Error::InvalidCredentials(DEFAULT_LOGIN_FAILURE.to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_single_flight() {
        let transport = refresh_ok();
        let manager = seeded_session(transport.clone(), "access-1", "refresh-1").await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.refresh().await }));
        }

        for handle in handles {
            let session = handle.await.unwrap().unwrap();
            assert_eq!(session.access_token, "access-2");
        }

        assert_eq!(transport.calls_to("/admin/auth/refresh"), 1);
        assert_eq!(transport.requests()[0].bearer.as_deref(), Some("refresh-1"));
        assert_eq!(manager.access_token().as_deref(), Some("access-2"));
    }

    #[tokio::test]
    async fn test_sequential_refreshes_each_call_backend() {
        let transport = refresh_ok();
        let manager = seeded_session(transport.clone(), "access-1", "refresh-1").await;

        manager.refresh().await.unwrap();
        manager.refresh().await.unwrap();
        assert_eq!(transport.calls_to("/admin/auth/refresh"), 2);
        assert_eq!(transport.requests()[1].bearer.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_cancel_refresh() {
        let transport = refresh_ok();
        let manager = seeded_session(transport.clone(), "access-1", "refresh-1").await;

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();

        let session = second.await.unwrap().unwrap();
        assert_eq!(session.access_token, "access-2");
        assert_eq!(transport.calls_to("/admin/auth/refresh"), 1);
    }

    /// Each refresh token mints the next pair: refresh-1 gives access-2/refresh-2
    fn chained_refresh() -> Arc<ScriptedTransport> {
        ScriptedTransport::with_delay(Duration::from_millis(40), |req| {
            let n: u32 = req
                .bearer
                .as_deref()
                .and_then(|b| b.strip_prefix("refresh-"))
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let (access, refresh) = (format!("access-{}", n + 1), format!("refresh-{}", n + 1));
            respond(200, auth_body(&access, &refresh, "ELECTION_OFFICIAL"))
        })
    }

    #[tokio::test]
    async fn test_unobserved_refresh_is_not_reused() {
        let transport = chained_refresh();
        let manager = seeded_session(transport.clone(), "access-1", "refresh-1").await;

        let abandoned = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        abandoned.abort();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(manager.access_token().as_deref(), Some("access-2"));

        let session = manager.refresh().await.unwrap();
        assert_eq!(session.access_token, "access-3");
        assert_eq!(transport.calls_to("/admin/auth/refresh"), 2);
        assert_eq!(transport.requests()[1].bearer.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_rejected_refresh_tears_down() {
        let transport = ScriptedTransport::new(|_| {
            respond(401, json!({ "message": "Invalid refresh token" }))
        });
        let manager = seeded_session(transport, "access-1", "refresh-1").await;
        let mut events = manager.events();

        let err = manager.refresh().await.unwrap_err();
        assert_eq!(err, Error::RefreshExpired("Invalid refresh token".to_string()));
        assert!(err.requires_login());
        assert!(!manager.is_authenticated());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
        assert!(manager.inner.store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_failure_body_tears_down() {
        let transport = ScriptedTransport::new(|_| {
            respond(200, json!({ "success": false, "message": "Refresh token revoked" }))
        });
        let manager = seeded_session(transport, "access-1", "refresh-1").await;

        let err = manager.refresh().await.unwrap_err();
        assert_eq!(err, Error::RefreshExpired("Refresh token revoked".to_string()));
        assert!(manager.current().is_none());
    }

    #[tokio::test]
    async fn test_refresh_server_error_keeps_session() {
        let transport = ScriptedTransport::new(|_| respond(503, json!({ "message": "maintenance" })));
        let manager = seeded_session(transport, "access-1", "refresh-1").await;

        let err = manager.refresh().await.unwrap_err();
        assert_eq!(err, Error::ServerError { status: 503, message: "maintenance".into() });
        assert!(manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let transport = refresh_ok();
        let manager = SessionManager::open(TokenStore::in_memory().unwrap(), transport.clone())
            .await
            .unwrap();

        assert!(matches!(manager.refresh().await, Err(Error::RefreshExpired(_))));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let transport = refresh_ok();
        let manager = seeded_session(transport, "access-1", "refresh-1").await;
        let mut events = manager.events();
        let watcher = manager.subscribe();

        manager.logout().await;
        manager.logout().await;

        assert!(manager.current_user().is_none());
        assert!(!manager.is_authenticated());
        assert!(watcher.borrow().is_none());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
        assert!(events.try_recv().is_err());
        assert!(manager.inner.store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_refresh_outcome_ignored() {
        let transport = refresh_ok();
        let manager = seeded_session(transport, "access-1", "refresh-1").await;

        // A login lands while a refresh issued with refresh-1 is outstanding
        manager
            .inner
            .commit(session_fixture("access-9", "refresh-9"), SessionEvent::Refreshed)
            .await
            .unwrap();

        let settled = manager
            .inner
            .settle_refresh("refresh-1", Ok(session_fixture("access-2", "refresh-2")))
            .await
            .unwrap();
        assert_eq!(settled.access_token, "access-9");

        let settled = manager
            .inner
            .settle_refresh("refresh-1", Err("Invalid refresh token".to_string()))
            .await
            .unwrap();
        assert_eq!(settled.access_token, "access-9");
        assert!(manager.is_authenticated());
    }
}
