use tracing::trace;

use crate::error::CoreError;
use crate::ids::{CallId, IdAllocator};
use crate::msg::CallDescriptor;
use crate::value::Value;

/// Calls waiting for the next transmission, in the order they were added.
///
/// Not synchronized: whoever owns the queue must also own the allocator and
/// the result store for the whole enqueue-to-unwrap cycle.
#[derive(Debug, Default)]
pub struct PendingQueue {
    calls: Vec<CallDescriptor>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a call and returns its id. An explicit id must not clash with
    /// one already queued; without one, the allocator supplies it.
    pub fn enqueue(
        &mut self,
        ids: &IdAllocator,
        method: &str,
        params: Vec<Value>,
        id: Option<CallId>,
    ) -> Result<CallId, CoreError> {
        if method.trim().is_empty() {
            return Err(CoreError::invalid_call("method name is empty"));
        }

        let id = match id {
            Some(id) if self.contains(id) => {
                return Err(CoreError::invalid_call(format!("{} is already queued", id)));
            }
            Some(id) => id,
            None => {
                let mut id = ids.next();
                while self.contains(id) {
                    id = ids.next();
                }
                id
            }
        };

        trace!("Queued {} as {}", method, id);
        self.calls.push(CallDescriptor::new(method, params, id));
        Ok(id)
    }

    /// Takes every queued call, leaving the queue empty.
    pub fn drain_all(&mut self) -> Vec<CallDescriptor> {
        std::mem::take(&mut self.calls)
    }

    pub fn contains(&self, id: CallId) -> bool {
        self.calls.iter().any(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallDescriptor> {
        self.calls.iter()
    }
}
