//! Client for Trac's JSON-RPC interface.
//!
//! Calls are queued on a [`Client`] and sent either one at a time or, in
//! batch mode, folded into a single `system.multicall` request. Results are
//! read back by call id after each [`Client::execute`].

pub mod client;
pub mod trac;

pub use client::{Client, ClientConfig, ClientError, Reply};
pub use trac::{EnumAction, EnumKind, NewTicket, TicketUpdate};
pub use tracrpc_core::{CallId, CallOutcome, RemoteError, ResultStore, Value};
pub use tracrpc_transport::{Credentials, HttpConfig, HttpTransport, Transport, TransportError};
