pub mod transport;
#[cfg(feature = "http")]
pub mod http;

pub use transport::{Credentials, Transport, TransportError};
#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpTransport};
