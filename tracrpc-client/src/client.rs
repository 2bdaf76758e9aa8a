// Trac JSON-RPC Client
// Queues calls, sends them one at a time or folded into a single
// system.multicall request, and keeps the per-call results of the last
// transmission for lookup by id.

use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use tracrpc_core::{
    compile, decode_response, encode_envelope, unwrap_reply, CallId, CallOutcome, CoreError,
    IdAllocator, PendingQueue, RemoteError, ResultStore, Value,
};
use tracrpc_transport::{Credentials, HttpConfig, HttpTransport, Transport, TransportError};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// JSON-RPC endpoint, e.g. `https://trac.example.org/login/jsonrpc`
    pub endpoint: String,
    /// Login name; no credentials are sent while this is empty
    pub user: String,
    pub password: String,
    /// Fold queued calls into one `system.multicall` request
    pub batch_mode: bool,
    #[serde(flatten)]
    pub http: HttpConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/login/jsonrpc".to_string(),
            user: String::new(),
            password: String::new(),
            batch_mode: false,
            http: HttpConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_batch_mode(mut self, batch_mode: bool) -> Self {
        self.batch_mode = batch_mode;
        self
    }

    pub fn credentials(&self) -> Option<Credentials> {
        if self.user.is_empty() {
            None
        } else {
            Some(Credentials::new(self.user.clone(), self.password.clone()))
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Transport failed for {} call(s): {source}", .calls.len())]
    Transport {
        calls: Vec<CallId>,
        #[source]
        source: TransportError,
    },
    #[error("Malformed response for {} call(s): {reason}", .calls.len())]
    Malformed { calls: Vec<CallId>, reason: String },
    #[error("{id} failed: {error}")]
    Remote { id: CallId, error: RemoteError },
    #[error("No result stored for {0}")]
    MissingResult(CallId),
}

impl ClientError {
    /// Calls that were sent but ended without a stored result.
    pub fn failed_calls(&self) -> &[CallId] {
        match self {
            ClientError::Transport { calls, .. } | ClientError::Malformed { calls, .. } => calls,
            _ => &[],
        }
    }
}

/// What a call hands back: the value in single-call mode, the id to look
/// the result up by in batch mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Done(Value),
    Queued(CallId),
}

impl Reply {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Reply::Done(value) => Some(value),
            Reply::Queued(_) => None,
        }
    }

    pub fn queued_id(&self) -> Option<CallId> {
        match self {
            Reply::Queued(id) => Some(*id),
            Reply::Done(_) => None,
        }
    }
}

/// Main client struct for Trac JSON-RPC communication
///
/// Every operation takes `&mut self`, so the queue, the id counter and the
/// result store are owned by one caller from enqueue through unwrap. Share
/// a client between tasks by wrapping it in `tokio::sync::Mutex`.
#[derive(Debug)]
pub struct Client<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
    ids: IdAllocator,
    queue: PendingQueue,
    store: ResultStore,
    last_body: Option<Bytes>,
}

impl Client<HttpTransport> {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config.http).map_err(|source| {
            ClientError::Transport {
                calls: Vec::new(),
                source,
            }
        })?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a new client with default configuration
    pub fn new_with_url(url: &str) -> Result<Self, ClientError> {
        Self::new(ClientConfig::new(url))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            ids: IdAllocator::new(),
            queue: PendingQueue::new(),
            store: ResultStore::new(),
            last_body: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.config.endpoint = endpoint.into();
    }

    pub fn set_credentials(&mut self, user: impl Into<String>, password: impl Into<String>) {
        self.config.user = user.into();
        self.config.password = password.into();
    }

    pub fn set_batch_mode(&mut self, batch_mode: bool) -> bool {
        self.config.batch_mode = batch_mode;
        batch_mode
    }

    pub fn batch_mode(&self) -> bool {
        self.config.batch_mode
    }

    /// Number of calls waiting for the next [`execute`](Self::execute).
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue a call under a freshly allocated id
    pub fn enqueue(&mut self, method: &str, params: Vec<Value>) -> Result<CallId, ClientError> {
        Ok(self.queue.enqueue(&self.ids, method, params, None)?)
    }

    /// Queue a call under a caller-chosen id
    pub fn enqueue_with_id(
        &mut self,
        method: &str,
        params: Vec<Value>,
        id: CallId,
    ) -> Result<CallId, ClientError> {
        Ok(self.queue.enqueue(&self.ids, method, params, Some(id))?)
    }

    /// Send everything queued in one round trip and store the results.
    ///
    /// The queue is emptied as soon as the request is compiled. If the round
    /// trip or the unwrap fails, the store is left empty and the error lists
    /// the calls that were lost.
    pub async fn execute(&mut self) -> Result<(), ClientError> {
        let envelope = compile(&mut self.queue, &self.ids, self.config.batch_mode)?;
        let calls = envelope.call_ids();

        let body = match encode_envelope(&envelope) {
            Ok(body) => body,
            Err(e) => {
                self.store = ResultStore::new();
                return Err(ClientError::Malformed {
                    calls,
                    reason: format!("request could not be encoded: {}", e),
                });
            }
        };

        debug!(
            "Sending {} to {}: {} call(s)",
            envelope.method(),
            self.config.endpoint,
            calls.len()
        );

        let credentials = self.config.credentials();
        let response = match self
            .transport
            .send(&self.config.endpoint, body, credentials.as_ref())
            .await
        {
            Ok(response) => response,
            Err(source) => {
                warn!("Transport failed for {} call(s): {}", calls.len(), source);
                self.store = ResultStore::new();
                self.last_body = None;
                return Err(ClientError::Transport { calls, source });
            }
        };

        let unwrapped = decode_response(&response).and_then(|json| unwrap_reply(&envelope, json));
        self.last_body = Some(response);

        match unwrapped {
            Ok(store) => {
                debug!("Stored {} result(s)", store.len());
                self.store = store;
                Ok(())
            }
            Err(e) => {
                warn!("Discarding malformed response: {}", e);
                self.store = ResultStore::new();
                Err(ClientError::Malformed {
                    calls,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Queue a call and, outside batch mode, send it right away.
    ///
    /// In batch mode this only queues and returns [`Reply::Queued`]. In
    /// single-call mode the stored value comes back directly; a remote error
    /// for the call is returned as [`ClientError::Remote`] and also stays
    /// readable through [`error`](Self::error).
    pub async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Reply, ClientError> {
        let id = self.enqueue(method, params)?;
        if self.config.batch_mode {
            return Ok(Reply::Queued(id));
        }

        self.execute().await?;

        // Servers that drop the id land under the default id; the single
        // stored outcome is still ours.
        let outcome = self
            .store
            .get(id)
            .or_else(|| self.store.last().map(|(_, outcome)| outcome))
            .ok_or(ClientError::MissingResult(id))?;

        match &outcome.error {
            Some(error) => Err(ClientError::Remote {
                id,
                error: error.clone(),
            }),
            None => Ok(Reply::Done(outcome.value.clone())),
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn outcome(&self, id: CallId) -> Option<&CallOutcome> {
        self.store.get(id)
    }

    pub fn result(&self, id: CallId) -> Option<&Value> {
        self.store.value(id)
    }

    /// Results for the given ids; ids with nothing stored are left out.
    pub fn results(&self, ids: &[CallId]) -> IndexMap<CallId, &Value> {
        self.store.values(ids)
    }

    /// Result of the most recently stored call.
    pub fn last_result(&self) -> Option<&Value> {
        self.store.last().map(|(_, outcome)| &outcome.value)
    }

    /// `None` if nothing is stored for `id`, `Some(None)` if the call
    /// completed without error.
    pub fn error(&self, id: CallId) -> Option<Option<&RemoteError>> {
        self.store.error(id)
    }

    pub fn errors(&self, ids: &[CallId]) -> IndexMap<CallId, Option<&RemoteError>> {
        self.store.errors(ids)
    }

    pub fn last_error(&self) -> Option<Option<&RemoteError>> {
        self.store.last().map(|(_, outcome)| outcome.error.as_ref())
    }

    /// Raw body of the last response received, kept even when it could not
    /// be unwrapped. `None` before the first round trip and after a
    /// transport failure.
    pub fn last_response_body(&self) -> Option<&Bytes> {
        self.last_body.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Client::new(ClientConfig::default());
        assert!(client.is_ok());
        let client = Client::new_with_url("https://trac.example.org/login/jsonrpc").unwrap();
        assert_eq!(client.config().endpoint, "https://trac.example.org/login/jsonrpc");
        assert!(!client.batch_mode());
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::new("https://trac.example.org/login/jsonrpc")
            .with_credentials("alice", "s3cret")
            .with_batch_mode(true);
        assert!(config.batch_mode);
        assert_eq!(config.credentials(), Some(Credentials::new("alice", "s3cret")));
        assert_eq!(ClientConfig::default().credentials(), None);
    }

    #[test]
    fn test_config_from_json() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"endpoint": "https://trac.example.org/jsonrpc", "user": "bob", "batch_mode": true, "timeout_ms": 1000}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "https://trac.example.org/jsonrpc");
        assert_eq!(config.user, "bob");
        assert_eq!(config.password, "");
        assert!(config.batch_mode);
        assert_eq!(config.http.timeout_ms, 1000);
        assert_eq!(config.http.connect_timeout_ms, 5_000);
    }

    #[test]
    fn test_enqueue_and_pending() {
        let mut client = Client::new(ClientConfig::default()).unwrap();
        let a = client.enqueue("ticket.get", vec![Value::from("32")]).unwrap();
        let b = client.enqueue_with_id("ticket.getActions", vec![], CallId::new(10)).unwrap();
        assert_eq!(a, CallId::new(1));
        assert_eq!(b, CallId::new(10));
        assert_eq!(client.pending(), 2);

        let err = client.enqueue("", vec![]).unwrap_err();
        assert!(matches!(err, ClientError::Core(CoreError::InvalidCall(_))));
        assert_eq!(client.pending(), 2);
    }

    #[test]
    fn test_reply_helpers() {
        assert_eq!(Reply::Done(Value::from(1i64)).into_value(), Some(Value::from(1i64)));
        assert_eq!(Reply::Queued(CallId::new(3)).queued_id(), Some(CallId::new(3)));
        assert_eq!(Reply::Queued(CallId::new(3)).into_value(), None);
    }

    #[test]
    fn test_error_failed_calls() {
        let err = ClientError::Malformed {
            calls: vec![CallId::new(1), CallId::new(2)],
            reason: "bad".to_string(),
        };
        assert_eq!(err.failed_calls(), &[CallId::new(1), CallId::new(2)]);
        assert_eq!(err.to_string(), "Malformed response for 2 call(s): bad");
        assert!(ClientError::MissingResult(CallId::new(1)).failed_calls().is_empty());
    }
}
