//! Opaque session state threaded between BMP calls.

use std::fmt;

use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use super::START_MILLIS_KEY;

/// Server-issued continuation state.
///
/// Issued by the init call and replaced wholesale by every later call that
/// returns a `session` field. The JSON text is kept exactly as the service
/// sent it and written back byte for byte: key order, number spelling and
/// string escapes all survive. The only reads the client performs are the
/// two derived accessors below, which parse lazily and return a zero value
/// instead of failing.
#[derive(Clone, Serialize)]
#[serde(transparent)]
pub struct SessionState(Box<RawValue>);

impl SessionState {
    /// Session JSON exactly as received.
    pub fn as_raw(&self) -> &str {
        self.0.get()
    }

    /// Parse the session into a mapping.
    pub fn to_map(&self) -> Map<String, Value> {
        serde_json::from_str(self.0.get()).unwrap_or_default()
    }

    /// True if the service issued an empty session.
    pub fn is_empty(&self) -> bool {
        self.to_map().is_empty()
    }

    /// String stored under `key`, or `""` if missing or not a string.
    pub fn string_field(&self, key: &str) -> String {
        match self.field(key) {
            Some(Value::String(value)) => value,
            _ => String::new(),
        }
    }

    /// Session start time in milliseconds, or 0 if missing or not a number.
    pub fn start_millis(&self) -> i64 {
        self.field(START_MILLIS_KEY)
            .as_ref()
            .and_then(Value::as_f64)
            .map_or(0, |millis| millis as i64)
    }

    fn field(&self, key: &str) -> Option<Value> {
        self.to_map().remove(key)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self(RawValue::from_string("{}".to_owned()).expect("empty object is valid JSON"))
    }
}

/// Sessions are equal when their JSON text is identical.
impl PartialEq for SessionState {
    fn eq(&self, other: &Self) -> bool {
        self.as_raw() == other.as_raw()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionState").field(&self.as_raw()).finish()
    }
}

impl<'de> Deserialize<'de> for SessionState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        if !raw.get().starts_with('{') {
            return Err(de::Error::invalid_type(
                Unexpected::Other(raw.get()),
                &"a JSON object",
            ));
        }
        Ok(Self(raw))
    }
}

impl From<Map<String, Value>> for SessionState {
    fn from(map: Map<String, Value>) -> Self {
        let raw = serde_json::value::to_raw_value(&map).expect("string-keyed map serializes");
        Self(raw)
    }
}
