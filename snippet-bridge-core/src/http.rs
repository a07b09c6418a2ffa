//! reqwest-backed [`Transport`] and the shared "send and require success" helper.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::ServiceConfig;
use crate::contract::{
    ApiRequest, ApiResponse, HttpMethod, RequestBody, Transport, TransportError,
};
use crate::error::{MigrationError, Result};

const USER_AGENT: &str = concat!("snippet-bridge/", env!("CARGO_PKG_VERSION"));

/// Production transport. GitHub rejects requests without a User-Agent, so
/// one is always set.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            error!(error = ?e, "Failed to construct HTTP client");
            MigrationError::Transport {
                url: String::new(),
                message: e.to_string(),
            }
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        }
        .bearer_auth(&request.bearer_token)
        .header(reqwest::header::ACCEPT, &request.accept);

        let builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url = %request.url, status, bytes = body.len(), "HTTP response received");
        Ok(ApiResponse { status, body })
    }
}

/// Sends `request` and returns the raw response, mapping transport failures.
pub async fn send<T>(transport: &T, request: ApiRequest) -> Result<ApiResponse>
where
    T: Transport + ?Sized,
{
    let url = request.url.clone();
    transport.send(request).await.map_err(|e| {
        error!(url = %url, error = %e, "Request produced no response");
        MigrationError::Transport {
            url,
            message: e.to_string(),
        }
    })
}

/// Sends `request` and requires a 2xx status; anything else becomes
/// [`MigrationError::Remote`] carrying `context`, the status and the body.
pub async fn send_expecting_success<T>(
    transport: &T,
    request: ApiRequest,
    context: &str,
) -> Result<String>
where
    T: Transport + ?Sized,
{
    let response = send(transport, request).await?;
    if response.is_success() {
        Ok(response.body)
    } else {
        error!(context, status = response.status, "Remote call returned non-success status");
        Err(MigrationError::Remote {
            context: context.to_string(),
            status: response.status,
            body: response.body,
        })
    }
}

/// Parses a success body as JSON.
pub fn decode<D: DeserializeOwned>(body: &str, context: &str) -> Result<D> {
    serde_json::from_str(body).map_err(|e| MigrationError::Decode {
        context: context.to_string(),
        message: e.to_string(),
    })
}
