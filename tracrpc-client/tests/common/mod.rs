// Shared test transport: records every request body and answers it the way
// a Trac server would, one reply per inner call.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value as JsonValue};
use std::sync::Mutex;
use tracrpc_client::{Credentials, Transport, TransportError};

type Responder = Box<dyn Fn(&str, &JsonValue) -> Result<JsonValue, JsonValue> + Send + Sync>;

enum Mode {
    Answer(Responder),
    Raw(Vec<u8>),
    Fail,
}

pub struct MockTransport {
    mode: Mode,
    sent: Mutex<Vec<JsonValue>>,
    logins: Mutex<Vec<Option<Credentials>>>,
}

impl MockTransport {
    /// Answers each call with `respond(method, params)`; `Err` becomes the
    /// call's `error` member.
    pub fn answering(
        respond: impl Fn(&str, &JsonValue) -> Result<JsonValue, JsonValue> + Send + Sync + 'static,
    ) -> Self {
        Self::with_mode(Mode::Answer(Box::new(respond)))
    }

    /// Echoes each call's method and params back as its result.
    pub fn echo() -> Self {
        Self::answering(|method, params| Ok(json!({"method": method, "params": params})))
    }

    pub fn raw(body: &str) -> Self {
        Self::with_mode(Mode::Raw(body.as_bytes().to_vec()))
    }

    pub fn failing() -> Self {
        Self::with_mode(Mode::Fail)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            sent: Mutex::new(Vec::new()),
            logins: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<JsonValue> {
        self.sent.lock().unwrap().clone()
    }

    pub fn round_trips(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn logins(&self) -> Vec<Option<Credentials>> {
        self.logins.lock().unwrap().clone()
    }
}

fn reply(respond: &Responder, call: &JsonValue) -> JsonValue {
    let method = call["method"].as_str().unwrap_or_default();
    match respond(method, &call["params"]) {
        Ok(result) => json!({"result": result, "error": null, "id": call["id"]}),
        Err(error) => json!({"result": null, "error": error, "id": call["id"]}),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        _endpoint: &str,
        body: Bytes,
        credentials: Option<&Credentials>,
    ) -> Result<Bytes, TransportError> {
        let request: JsonValue = serde_json::from_slice(&body).unwrap();
        self.sent.lock().unwrap().push(request.clone());
        self.logins.lock().unwrap().push(credentials.cloned());

        match &self.mode {
            Mode::Fail => Err(TransportError::Connection("connection refused".to_string())),
            Mode::Raw(body) => Ok(Bytes::from(body.clone())),
            Mode::Answer(respond) => {
                let response = if request["method"] == "system.multicall" {
                    let inner: Vec<JsonValue> = request["params"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .map(|call| reply(respond, call))
                        .collect();
                    json!({"result": inner, "error": null, "id": request["id"]})
                } else {
                    reply(respond, &request)
                };
                Ok(Bytes::from(serde_json::to_vec(&response).unwrap()))
            }
        }
    }
}
