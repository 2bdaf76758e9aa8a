use indexmap::IndexMap;

use crate::error::{CoreError, RemoteError};
use crate::ids::CallId;
use crate::value::Value;

/// What came back for one call: its value and its error slot.
///
/// A stored outcome always has an error slot; `None` there means the call
/// completed without error, which is different from the call not being
/// stored at all.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub value: Value,
    pub error: Option<RemoteError>,
}

impl CallOutcome {
    pub fn ok(value: Value) -> Self {
        Self { value, error: None }
    }

    pub fn failed(value: Value, error: RemoteError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The value, or the remote error if one was reported.
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }
}

/// Outcomes of one transmission keyed by call id, in the order the
/// response listed them. Built once per transmission and replaced whole by
/// the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    entries: IndexMap<CallId, CallOutcome>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome. Each id is written at most once per store.
    pub fn record(&mut self, id: CallId, outcome: CallOutcome) -> Result<(), CoreError> {
        if self.entries.contains_key(&id) {
            return Err(CoreError::malformed(format!(
                "response lists {} more than once",
                id
            )));
        }
        self.entries.insert(id, outcome);
        Ok(())
    }

    pub fn get(&self, id: CallId) -> Option<&CallOutcome> {
        self.entries.get(&id)
    }

    pub fn value(&self, id: CallId) -> Option<&Value> {
        self.get(id).map(|o| &o.value)
    }

    /// `None` when the id was never stored; `Some(None)` when it completed
    /// cleanly.
    pub fn error(&self, id: CallId) -> Option<Option<&RemoteError>> {
        self.get(id).map(|o| o.error.as_ref())
    }

    /// Values for the requested ids. Ids never stored are left out.
    pub fn values(&self, ids: &[CallId]) -> IndexMap<CallId, &Value> {
        ids.iter()
            .filter_map(|id| self.value(*id).map(|v| (*id, v)))
            .collect()
    }

    /// Error slots for the requested ids. Ids never stored are left out.
    pub fn errors(&self, ids: &[CallId]) -> IndexMap<CallId, Option<&RemoteError>> {
        ids.iter()
            .filter_map(|id| self.error(*id).map(|e| (*id, e)))
            .collect()
    }

    /// Most recently recorded outcome.
    pub fn last(&self) -> Option<(CallId, &CallOutcome)> {
        self.entries.last().map(|(id, outcome)| (*id, outcome))
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = CallId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CallId, &CallOutcome)> {
        self.entries.iter().map(|(id, o)| (*id, o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
