//! Request Pipeline
//!
//! Single chokepoint for authenticated calls. Attaches the access token and
//! recovers from one authorization failure per request by refreshing the
//! session and re-issuing the call.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::{ApiRequest, ApiResponse, Transport};
use crate::error::{Error, Result};
use crate::session::SessionManager;

#[derive(Clone)]
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    session: SessionManager,
}

impl RequestPipeline {
    pub fn new(transport: Arc<dyn Transport>, session: SessionManager) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send a request, returning the successful response or a taxonomy error.
    ///
    /// A 401 on a non-auth call triggers one refresh and one retry. If the
    /// refresh fails the session is torn down and [`Error::SessionExpired`]
    /// is returned. A 401 on the retried call is returned as a plain
    /// [`Error::ServerError`].
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        if request.is_auth_endpoint() {
            let response = self.transport.execute(request).await?;
            return finish(response);
        }

        let sent_token = self.session.access_token();
        let response = self.dispatch(request.clone(), sent_token.clone()).await?;
        if !response.is_unauthorized() {
            return finish(response);
        }

        tracing::debug!("{} {} unauthorized, recovering session", request.method, request.path());

        let token = match self.session.access_token() {
            // Another request already refreshed while this one was out
            Some(current) if sent_token.as_deref() != Some(current.as_str()) => current,
            _ => match self.session.refresh().await {
                Ok(session) => session.access_token,
                Err(e) => {
                    tracing::warn!("Giving up on {} {}: {}", request.method, request.path(), e);
                    self.session.expire().await;
                    return Err(Error::SessionExpired);
                }
            },
        };

        let response = self.dispatch(request, Some(token)).await?;
        finish(response)
    }

    /// Send a request and decode the JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send(request).await?.json()
    }

    async fn dispatch(&self, request: ApiRequest, token: Option<String>) -> Result<ApiResponse> {
        let request = match token {
            Some(token) => request.with_bearer(token),
            None => request,
        };
        self.transport.execute(request).await
    }
}

fn finish(response: ApiResponse) -> Result<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(response.into_error())
    }
}
