use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::error::CoreError;
use crate::msg::Envelope;

pub const CONTENT_TYPE: &str = "application/json";

/// Serializes an envelope to the request body.
pub fn encode_envelope(envelope: &Envelope) -> Result<Bytes, CoreError> {
    let json = serde_json::to_vec(envelope)?;
    Ok(Bytes::from(json))
}

/// Parses a response body. Bodies that are empty or not JSON are reported
/// as malformed responses rather than codec errors.
pub fn decode_response(body: &[u8]) -> Result<JsonValue, CoreError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CoreError::malformed("empty response body"));
    }
    serde_json::from_slice(body).map_err(|e| CoreError::malformed(format!("invalid JSON: {}", e)))
}
