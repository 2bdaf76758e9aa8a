// Response unwrapping.
//
// A reply is either one `{"result", "error", "id"}` object or, for a
// multicall, one whose `result` is a list of such objects in queue order.
// Nested objects are descended into only while they look like response
// envelopes; anything else is a leaf value whose tagged members are
// converted to native values.

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, trace};

use crate::error::{CoreError, RemoteError};
use crate::ids::CallId;
use crate::msg::Envelope;
use crate::store::{CallOutcome, ResultStore};
use crate::value::{TaggedValue, Value};

/// A response object read off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub result: JsonValue,
    pub id: CallId,
    pub error: Option<JsonValue>,
}

impl ResponseEnvelope {
    /// True when `node` is shaped like a response object: it carries a
    /// `result` member, or both `error` and `id`.
    pub fn matches(node: &JsonValue) -> bool {
        node.as_object().is_some_and(Self::map_matches)
    }

    fn map_matches(map: &Map<String, JsonValue>) -> bool {
        map.contains_key("result") || (map.contains_key("error") && map.contains_key("id"))
    }

    /// Splits a response object into its parts. A missing or null `id`
    /// becomes [`CallId::DEFAULT`]; a null `error` counts as no error.
    pub fn from_map(mut map: Map<String, JsonValue>) -> Result<Self, CoreError> {
        let id = match map.remove("id") {
            None | Some(JsonValue::Null) => CallId::DEFAULT,
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .map(CallId::new)
                .ok_or_else(|| CoreError::malformed(format!("id {} is not a call id", n)))?,
            Some(other) => {
                return Err(CoreError::malformed(format!("id {} is not a call id", other)));
            }
        };
        let error = match map.remove("error") {
            None | Some(JsonValue::Null) => None,
            Some(error) => Some(error),
        };
        let result = map.remove("result").unwrap_or(JsonValue::Null);

        Ok(Self { result, id, error })
    }

    /// True when `result` holds the per-call replies of a multicall.
    pub fn is_multicall(&self) -> bool {
        match &self.result {
            JsonValue::Array(items) => !items.is_empty() && items.iter().all(Self::matches),
            _ => false,
        }
    }
}

/// Unwraps a decoded response into a fresh [`ResultStore`].
///
/// Only the calls the caller queued are recorded: a multicall's outer
/// envelope contributes its nested replies, not an entry of its own. Any
/// failure leaves nothing behind, since the partially built store is
/// dropped with the error.
pub fn unwrap_response(decoded: JsonValue) -> Result<ResultStore, CoreError> {
    let mut store = ResultStore::new();

    match decoded {
        JsonValue::Object(map) => {
            if !ResponseEnvelope::map_matches(&map) {
                return Err(CoreError::malformed("object has no result member"));
            }
            visit(ResponseEnvelope::from_map(map)?, &mut store)?;
        }
        // A bare list of replies, as sent by servers that answer a multicall
        // without an outer envelope.
        JsonValue::Array(items) => {
            for item in items {
                match item {
                    JsonValue::Object(map) if ResponseEnvelope::map_matches(&map) => {
                        visit(ResponseEnvelope::from_map(map)?, &mut store)?;
                    }
                    other => {
                        return Err(CoreError::malformed(format!(
                            "expected a response object, got {}",
                            other
                        )));
                    }
                }
            }
        }
        other => {
            return Err(CoreError::malformed(format!(
                "expected an object or array, got {}",
                other
            )));
        }
    }

    debug!("Unwrapped {} call results", store.len());
    Ok(store)
}

/// Unwraps the reply to `request`.
///
/// A multicall the server refused as a whole comes back as a single
/// response under the outer id. Its error is given to every inner call, and
/// the outer id never reaches the store. Such a reply without an error
/// accounts for none of the calls and is malformed.
pub fn unwrap_reply(request: &Envelope, json: JsonValue) -> Result<ResultStore, CoreError> {
    let store = unwrap_response(json)?;
    if !request.is_multicall() || !store.contains(request.id()) {
        return Ok(store);
    }

    let error = match store.get(request.id()) {
        Some(outcome) if store.len() == 1 => outcome.error.clone(),
        _ => None,
    };
    let Some(error) = error else {
        return Err(CoreError::malformed(format!(
            "multicall {} answered without per-call results",
            request.id()
        )));
    };

    debug!(
        "Multicall {} refused, failing {} calls",
        request.id(),
        request.len()
    );
    let mut failed = ResultStore::new();
    for id in request.call_ids() {
        failed.record(id, CallOutcome::failed(Value::Null, error.clone()))?;
    }
    Ok(failed)
}

// Recurses while the node's result holds nested envelopes; records a leaf
// otherwise.
fn visit(envelope: ResponseEnvelope, store: &mut ResultStore) -> Result<(), CoreError> {
    if envelope.is_multicall() {
        trace!("Descending into multicall reply {}", envelope.id);
        if let JsonValue::Array(items) = envelope.result {
            for item in items {
                if let JsonValue::Object(map) = item {
                    visit(ResponseEnvelope::from_map(map)?, store)?;
                }
            }
        }
        return Ok(());
    }

    let value = resolve_tags(envelope.result);
    let outcome = match envelope.error {
        Some(error) => CallOutcome::failed(value, RemoteError::new(error)),
        None => CallOutcome::ok(value),
    };
    store.record(envelope.id, outcome)
}

/// Converts a plain JSON tree into a [`Value`], replacing every tagged
/// object (at any depth) with its native value.
pub fn resolve_tags(json: JsonValue) -> Value {
    if let Some(tagged) = TaggedValue::detect(&json) {
        return tagged.decode();
    }

    match json {
        JsonValue::Array(items) => Value::Array(items.into_iter().map(resolve_tags).collect()),
        JsonValue::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, resolve_tags(v))).collect())
        }
        other => Value::from(other),
    }
}
