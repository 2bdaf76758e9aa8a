use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::ids::CallId;
use crate::value::Value;

/// Method name of the envelope that wraps a batch.
pub const MULTICALL_METHOD: &str = "system.multicall";

/// One queued remote call. Serializes as `{"method", "params", "id"}` in
/// that order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallDescriptor {
    pub method: String,
    pub params: Vec<Value>,
    pub id: CallId,
}

impl CallDescriptor {
    pub fn new(method: impl Into<String>, params: Vec<Value>, id: CallId) -> Self {
        Self {
            method: method.into(),
            params,
            id,
        }
    }
}

/// The single request object sent per transmission.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Single(CallDescriptor),
    Multicall { id: CallId, calls: Vec<CallDescriptor> },
}

impl Envelope {
    /// Id of the outer request object.
    pub fn id(&self) -> CallId {
        match self {
            Envelope::Single(call) => call.id,
            Envelope::Multicall { id, .. } => *id,
        }
    }

    pub fn method(&self) -> &str {
        match self {
            Envelope::Single(call) => &call.method,
            Envelope::Multicall { .. } => MULTICALL_METHOD,
        }
    }

    /// Ids the caller asked for, in queue order.
    pub fn call_ids(&self) -> Vec<CallId> {
        match self {
            Envelope::Single(call) => vec![call.id],
            Envelope::Multicall { calls, .. } => calls.iter().map(|c| c.id).collect(),
        }
    }

    pub fn is_multicall(&self) -> bool {
        matches!(self, Envelope::Multicall { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            Envelope::Single(_) => 1,
            Envelope::Multicall { calls, .. } => calls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Envelope::Single(call) => call.serialize(serializer),
            Envelope::Multicall { id, calls } => {
                let mut state = serializer.serialize_struct("Envelope", 3)?;
                state.serialize_field("method", MULTICALL_METHOD)?;
                state.serialize_field("params", calls)?;
                state.serialize_field("id", id)?;
                state.end()
            }
        }
    }
}
