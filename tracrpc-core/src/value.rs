// Values exchanged with the server.
//
// Plain JSON cannot carry dates or raw bytes, so the server wraps them as
// {"__jsonclass__": [kind, payload]}. `Value` keeps those two types native
// and writes the tagged form back out when serialized.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Number, Value as JsonValue};
use std::fmt;
use tracing::warn;

/// Object key that marks a tagged value on the wire.
pub const JSONCLASS_KEY: &str = "__jsonclass__";

/// Format used when sending datetimes.
pub const DATETIME_WIRE_FORMAT: &str = "%Y%m%dT%H:%M:%S+00:00";

/// A request parameter or an unwrapped result.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// Seconds since the Unix epoch, UTC.
    DateTime(i64),
    Binary(Bytes),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            Value::DateTime(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Binary(data) => Some(data),
            _ => None,
        }
    }

    /// Member lookup on objects, index lookup on arrays.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Plain JSON rendering, with datetimes and binaries in their tagged form.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::DateTime(ts) => match format_datetime(*ts) {
                Some(s) => json!({ JSONCLASS_KEY: ["datetime", s] }),
                None => json!({ JSONCLASS_KEY: ["datetime", ts.to_string()] }),
            },
            Value::Binary(data) => json!({ JSONCLASS_KEY: ["binary", STANDARD.encode(data)] }),
        }
    }
}

/// Structural conversion. Tagged objects are left as plain objects here;
/// the response unwrapper is what interprets them.
impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Value::Binary(data)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
            Value::DateTime(ts) => {
                let stamp = format_datetime(*ts)
                    .ok_or_else(|| S::Error::custom(format!("timestamp {} out of range", ts)))?;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(JSONCLASS_KEY, &("datetime", stamp))?;
                map.end()
            }
            Value::Binary(data) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(JSONCLASS_KEY, &("binary", STANDARD.encode(data)))?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Value::from)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// The kind named in the first slot of a `__jsonclass__` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedKind {
    Datetime,
    Binary,
    Unknown(String),
}

impl TaggedKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "datetime" => TaggedKind::Datetime,
            "binary" => TaggedKind::Binary,
            other => TaggedKind::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TaggedKind::Datetime => "datetime",
            TaggedKind::Binary => "binary",
            TaggedKind::Unknown(name) => name,
        }
    }
}

/// A `{"__jsonclass__": [kind, payload]}` object as found on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    pub kind: TaggedKind,
    pub payload: JsonValue,
}

impl TaggedValue {
    pub fn new(kind: TaggedKind, payload: JsonValue) -> Self {
        Self { kind, payload }
    }

    /// Recognizes a tagged value. The marker must hold an array whose first
    /// element is a string; a missing payload reads as null.
    pub fn detect(json: &JsonValue) -> Option<TaggedValue> {
        let marker = json.as_object()?.get(JSONCLASS_KEY)?.as_array()?;
        let kind = marker.first()?.as_str()?;
        Some(TaggedValue {
            kind: TaggedKind::from_name(kind),
            payload: marker.get(1).cloned().unwrap_or(JsonValue::Null),
        })
    }

    /// Converts to a native value. Total over every kind: payloads that
    /// cannot be interpreted are handed back as they arrived.
    pub fn decode(self) -> Value {
        match self.kind {
            TaggedKind::Datetime => match self.payload.as_str().and_then(parse_datetime) {
                Some(ts) => Value::DateTime(ts),
                None => {
                    warn!("Unparseable datetime payload: {}", self.payload);
                    Value::from(self.payload)
                }
            },
            TaggedKind::Binary => {
                match self.payload.as_str().map(|s| STANDARD.decode(s.trim())) {
                    Some(Ok(data)) => Value::Binary(Bytes::from(data)),
                    _ => {
                        warn!("Undecodable binary payload");
                        Value::from(self.payload)
                    }
                }
            }
            TaggedKind::Unknown(_) => Value::from(self.payload),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        json!({ JSONCLASS_KEY: [self.kind.name(), self.payload] })
    }
}

/// Parses a server timestamp into epoch seconds.
///
/// Accepted forms, tried in order: RFC 3339; `YYYYMMDDTHH:MM:SS` followed by
/// an offset; `YYYY-MM-DDTHH:MM:SS` followed by an offset; the same three
/// layouts (compact, dashed, space separated) without an offset, read as
/// UTC; and a bare `YYYY-MM-DD`, read as midnight UTC. Fractional seconds
/// are accepted after the seconds field and dropped.
pub fn parse_datetime(raw: &str) -> Option<i64> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }

    for fmt in ["%Y%m%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.timestamp());
        }
    }

    for fmt in [
        "%Y%m%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
}

/// Renders epoch seconds in [`DATETIME_WIRE_FORMAT`].
pub fn format_datetime(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.format(DATETIME_WIRE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_detect_binary() {
        let json = json!({"__jsonclass__": ["binary", "aGVsbG8="]});
        let tagged = TaggedValue::detect(&json).unwrap();
        assert_eq!(tagged.kind, TaggedKind::Binary);
        assert_eq!(tagged.decode(), Value::Binary(Bytes::from_static(b"hello")));
    }

    #[test]
    fn test_detect_datetime() {
        let json = json!({"__jsonclass__": ["datetime", "20240102T03:04:05"]});
        let tagged = TaggedValue::detect(&json).unwrap();
        assert_eq!(tagged.kind, TaggedKind::Datetime);
        assert_eq!(tagged.decode(), Value::DateTime(1_704_164_645));
    }

    #[test]
    fn test_unknown_kind_passes_payload_through() {
        let json = json!({"__jsonclass__": ["decimal", {"digits": "1.50"}]});
        let tagged = TaggedValue::detect(&json).unwrap();
        assert_eq!(tagged.kind, TaggedKind::Unknown("decimal".to_string()));
        assert_eq!(tagged.decode(), Value::from(json!({"digits": "1.50"})));
    }

    #[test]
    fn test_not_tagged() {
        assert!(TaggedValue::detect(&json!({"summary": "x"})).is_none());
        assert!(TaggedValue::detect(&json!({"__jsonclass__": "binary"})).is_none());
        assert!(TaggedValue::detect(&json!({"__jsonclass__": [42, "x"]})).is_none());
        assert!(TaggedValue::detect(&json!(["__jsonclass__"])).is_none());
    }

    #[test]
    fn test_missing_payload_reads_as_null() {
        let tagged = TaggedValue::detect(&json!({"__jsonclass__": ["other"]})).unwrap();
        assert_eq!(tagged.payload, JsonValue::Null);
        assert_eq!(tagged.decode(), Value::Null);
    }

    #[test]
    fn test_bad_payloads_are_kept_raw() {
        let bad_date = TaggedValue::new(TaggedKind::Datetime, json!("not a date"));
        assert_eq!(bad_date.decode(), Value::from("not a date"));

        let bad_binary = TaggedValue::new(TaggedKind::Binary, json!("***"));
        assert_eq!(bad_binary.decode(), Value::from("***"));
    }

    #[test]
    fn test_parse_datetime_forms() {
        let expected = 1_704_164_645;
        assert_eq!(parse_datetime("2024-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_datetime("2024-01-02T03:04:05+00:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-02T05:04:05+02:00"), Some(expected));
        assert_eq!(parse_datetime("20240102T03:04:05+00:00"), Some(expected));
        assert_eq!(parse_datetime("20240102T03:04:05"), Some(expected));
        assert_eq!(parse_datetime("2024-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_datetime("2024-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_datetime("2024-01-02"), Some(1_704_153_600));
        assert_eq!(parse_datetime("2024-01-02T03:04:05.123456"), Some(expected));
        assert_eq!(parse_datetime("20240102T03:04:05.5"), Some(expected));
        assert_eq!(parse_datetime("2024-01-02 03:04:05.25"), Some(expected));
        assert_eq!(parse_datetime("20240102T03:04:05.123+00:00"), Some(expected));
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn test_serialize_tagged_values() {
        let value = Value::Array(vec![
            Value::DateTime(1_704_164_645),
            Value::Binary(Bytes::from_static(b"hello")),
        ]);
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(
            text,
            r#"[{"__jsonclass__":["datetime","20240102T03:04:05+00:00"]},{"__jsonclass__":["binary","aGVsbG8="]}]"#
        );
        assert_eq!(serde_json::to_value(&value).unwrap(), value.to_json());
    }

    #[test]
    fn test_object_keeps_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("zeta".to_string(), Value::from(1i64));
        map.insert("alpha".to_string(), Value::from(2i64));
        let text = serde_json::to_string(&Value::Object(map)).unwrap();
        assert_eq!(text, r#"{"zeta":1,"alpha":2}"#);
    }

    #[test]
    fn test_accessors() {
        let value = Value::from(json!({"id": 32, "tags": ["a", "b"], "open": true}));
        assert_eq!(value.get("id").and_then(Value::as_i64), Some(32));
        assert_eq!(value.get("open").and_then(Value::as_bool), Some(true));
        let tags = value.get("tags").unwrap();
        assert_eq!(tags.get("1").and_then(Value::as_str), Some("b"));
        assert!(value.get("missing").is_none());
    }

    proptest! {
        #[test]
        fn prop_binary_tag_survives_the_wire(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let json = Value::Binary(Bytes::from(data.clone())).to_json();
            let decoded = TaggedValue::detect(&json).unwrap().decode();
            prop_assert_eq!(decoded, Value::Binary(Bytes::from(data)));
        }

        #[test]
        fn prop_datetime_tag_survives_the_wire(ts in 0i64..4_102_444_800) {
            let json = Value::DateTime(ts).to_json();
            let decoded = TaggedValue::detect(&json).unwrap().decode();
            prop_assert_eq!(decoded, Value::DateTime(ts));
        }
    }
}
