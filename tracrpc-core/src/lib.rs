//! Core of the Trac JSON-RPC client: call ids, the pending queue, the
//! `system.multicall` batch compiler and the response unwrapper.

pub mod codec;
pub mod compile;
pub mod error;
pub mod ids;
pub mod msg;
pub mod queue;
pub mod store;
pub mod unwrap;
pub mod value;

pub use codec::{decode_response, encode_envelope, CONTENT_TYPE};
pub use compile::compile;
pub use error::{CoreError, RemoteError};
pub use ids::{CallId, IdAllocator};
pub use msg::{CallDescriptor, Envelope, MULTICALL_METHOD};
pub use queue::PendingQueue;
pub use store::{CallOutcome, ResultStore};
pub use unwrap::{resolve_tags, unwrap_reply, unwrap_response, ResponseEnvelope};
pub use value::{format_datetime, parse_datetime, TaggedKind, TaggedValue, Value, JSONCLASS_KEY};
