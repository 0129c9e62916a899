//! HTTP Transport
//!
//! Production [`Transport`] over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// HTTP transport for the backend REST API
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a new transport rooted at `base_url` (e.g. `http://host:8081/api/v1`)
    pub fn new(base_url: &str, connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("API base URL {} cannot be a base", base_url)));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Create a transport from the `[api]` config section
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Resolve a request against the base URL
    fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("API base URL {} cannot be a base", self.base_url)))?;
            segments.pop_if_empty();
            segments.extend(request.segments.iter());
        }

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request)?;
        tracing::debug!("{} {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match (&request.body, request.method) {
            (Some(body), _) => builder.json(body),
            (None, Method::Post) => builder.json(&serde_json::json!({})),
            (None, Method::Get) => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ApiResponse::new(status, body))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::NetworkFailure(e.to_string())
    }
}
