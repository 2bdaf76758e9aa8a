use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation id carried in the `id` member of every request and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    /// Id recorded for a response that carried no usable `id` member.
    pub const DEFAULT: CallId = CallId(0);

    pub fn new(value: u64) -> Self {
        CallId(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self {
        CallId::new(value)
    }
}

/// Hands out call ids for one client instance.
///
/// The counter starts at 0 and is bumped before each use, so the first id
/// handed out is 1. Ids are never reused or decremented; a fresh allocator
/// (and therefore a fresh client) is the only way to start over.
#[derive(Debug)]
pub struct IdAllocator {
    current: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            current: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> CallId {
        let id = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        CallId::new(id)
    }

    /// Last id handed out, or 0 if none has been.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
