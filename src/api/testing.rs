//! Scripted transport and fixtures shared by the unit tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::{ApiRequest, ApiResponse, Transport};
use crate::error::Result;
use crate::session::{AdminRole, AdminUser, Session, SessionManager, TokenStore};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync>;

/// Transport answering every request through a closure, recording what it saw
pub(crate) struct ScriptedTransport {
    handler: Handler,
    delay: Option<Duration>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every response is held back for `delay`, so concurrent callers overlap
    pub(crate) fn with_delay(
        delay: Duration,
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: Some(delay),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path() == path)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&request)
    }
}

pub(crate) fn respond(status: u16, body: serde_json::Value) -> Result<ApiResponse> {
    Ok(ApiResponse::new(status, body.to_string()))
}

pub(crate) fn auth_body(access: &str, refresh: &str, role: &str) -> serde_json::Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "tokenType": "Bearer",
        "expiresIn": 900,
        "adminId": "adm-7",
        "email": "official@cec.example",
        "fullName": "Arta Hoxha",
        "role": role,
        "loginTime": "2026-03-01T09:15:00",
        "message": "Login successful",
        "success": true
    })
}

pub(crate) fn election_body(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Parliamentary Elections 2026",
        "electionType": "PARLIAMENTARY",
        "status": status,
        "electionDate": "2026-04-25T07:00:00",
        "registrationDeadline": "2026-03-25T23:59:00",
        "totalEligibleVoters": 10000,
        "totalVotesCast": 4200,
        "candidatesImported": status != "CREATED",
        "candidateCount": 12,
        "partyCount": 3,
        "parties": []
    })
}

pub(crate) fn session_fixture(access: &str, refresh: &str) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        token_type: "Bearer".to_string(),
        expires_in: 900,
        user: AdminUser {
            id: "adm-7".to_string(),
            email: "official@cec.example".to_string(),
            full_name: "Arta Hoxha".to_string(),
            role: AdminRole::ElectionOfficial,
        },
        login_time: Utc::now(),
    }
}

/// Session manager whose store already holds a session with the given tokens
pub(crate) async fn seeded_session(
    transport: Arc<ScriptedTransport>,
    access: &str,
    refresh: &str,
) -> SessionManager {
    let store = TokenStore::in_memory().unwrap();
    store.save(&session_fixture(access, refresh)).await.unwrap();
    SessionManager::open(store, transport).await.unwrap()
}
