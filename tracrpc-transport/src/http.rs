use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};
use tracrpc_core::CONTENT_TYPE;

use crate::{Credentials, Transport, TransportError};

/// Settings for the HTTP client behind [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Skip TLS certificate and host name checks (self-signed Trac hosts)
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            accept_invalid_certs: false,
        }
    }
}

/// POSTs JSON bodies with `reqwest`, following redirects and sending
/// basic auth when credentials are supplied.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        body: Bytes,
        credentials: Option<&Credentials>,
    ) -> Result<Bytes, TransportError> {
        if endpoint.is_empty() {
            return Err(TransportError::Client("endpoint is not set".to_string()));
        }

        debug!("POST {} ({} bytes)", endpoint, body.len());
        trace!("Request body: {}", String::from_utf8_lossy(&body));

        let mut request = self
            .http_client
            .post(endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .body(body);

        if let Some(creds) = credentials.filter(|c| !c.user.is_empty()) {
            request = request.basic_auth(&creds.user, Some(&creds.password));
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        trace!("Response body: {}", String::from_utf8_lossy(&bytes));
        Ok(bytes)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::Client(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}
