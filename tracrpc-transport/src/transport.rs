use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Transport setup failed: {0}")]
    Client(String),
}

/// Login sent with each request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sends one request body and hands back the response body.
///
/// `send` returns only once the outcome is known. A non-2xx status or a
/// connection failure is an error, never a body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        body: Bytes,
        credentials: Option<&Credentials>,
    ) -> Result<Bytes, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(
        &self,
        endpoint: &str,
        body: Bytes,
        credentials: Option<&Credentials>,
    ) -> Result<Bytes, TransportError> {
        (**self).send(endpoint, body, credentials).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(
        &self,
        endpoint: &str,
        body: Bytes,
        credentials: Option<&Credentials>,
    ) -> Result<Bytes, TransportError> {
        (**self).send(endpoint, body, credentials).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alice", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Http {
            status: 401,
            body: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 401: Unauthorized");
        assert_eq!(TransportError::Timeout.to_string(), "Request timed out");
    }
}
