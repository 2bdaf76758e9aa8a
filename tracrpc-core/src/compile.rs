use tracing::debug;

use crate::error::CoreError;
use crate::ids::IdAllocator;
use crate::msg::Envelope;
use crate::queue::PendingQueue;

/// Turns the pending queue into the one envelope sent per transmission.
///
/// Single-call mode sends the lone queued call as is. Batch mode wraps the
/// whole queue in `system.multicall` under a freshly allocated outer id;
/// inner calls keep their ids so results can be matched up afterwards.
///
/// The queue is validated before it is drained, so a failed compile leaves
/// every queued call in place.
pub fn compile(
    queue: &mut PendingQueue,
    ids: &IdAllocator,
    batch_mode: bool,
) -> Result<Envelope, CoreError> {
    if queue.is_empty() {
        return Err(CoreError::EmptyBatch);
    }

    if !batch_mode {
        if queue.len() != 1 {
            return Err(CoreError::UnbatchedQueue { queued: queue.len() });
        }
        let mut calls = queue.drain_all();
        let call = calls.remove(0);
        debug!("Compiled single call {} ({})", call.id, call.method);
        return Ok(Envelope::Single(call));
    }

    let calls = queue.drain_all();
    // Explicit inner ids may sit ahead of the allocator; skip past them.
    let mut id = ids.next();
    while calls.iter().any(|c| c.id == id) {
        id = ids.next();
    }
    debug!("Compiled multicall {} wrapping {} calls", id, calls.len());
    Ok(Envelope::Multicall { id, calls })
}
