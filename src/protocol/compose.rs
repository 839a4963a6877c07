//! Request payload composition.
//!
//! A payload starts from fixed base fields and is then layered with either a
//! flat map of extra fields or an ordered list of [`BmpOption`]s. Options run
//! in list order against the accumulating payload, so the last option to set
//! a key wins.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

use super::session::SessionState;
use super::{APP_PACKAGE_KEY, BMP_VERSION_KEY, SESSION_KEY};
use crate::error::{BmpError, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Field {
    Value(Value),
    // written as the raw text the service issued
    Session(SessionState),
}

/// JSON object sent as a request body.
///
/// Fields keep insertion order; overwriting a key keeps its position.
#[derive(Debug, Clone, Default)]
pub struct RequestPayload(Vec<(String, Field)>);

impl RequestPayload {
    /// Base payload with the protocol version and application package.
    pub fn new(bmp_version: &str, app_package: &str) -> Self {
        let mut payload = Self::default();
        payload.insert(BMP_VERSION_KEY, bmp_version);
        payload.insert(APP_PACKAGE_KEY, app_package);
        payload
    }

    /// Add the current session under `session`.
    pub fn with_session(mut self, session: &SessionState) -> Self {
        self.set_session(session.clone());
        self
    }

    /// Insert or overwrite the `session` field.
    pub fn set_session(&mut self, session: SessionState) {
        self.put(SESSION_KEY.to_string(), Field::Session(session));
    }

    /// Insert or overwrite a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.put(key.into(), Field::Value(value.into()));
    }

    /// Field value, if set.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, field)| match field {
            Field::Value(value) => value.clone(),
            Field::Session(session) => Value::Object(session.to_map()),
        })
    }

    /// Merge a flat map of fields over the payload.
    ///
    /// Entries overwrite existing keys. No order is promised among the
    /// entries of `fields` themselves.
    pub fn merge_fields(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            self.put(key, Field::Value(value));
        }
    }

    /// Run options against the payload in order.
    pub fn apply(&mut self, options: impl IntoIterator<Item = BmpOption>) {
        for option in options {
            option.apply(self);
        }
    }

    /// Serialize to a JSON request body.
    pub fn to_bytes(&self) -> Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| BmpError::transport("error while marshalling request", e))
    }

    fn put(&mut self, key: String, field: Field) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = field,
            None => self.0.push((key, field)),
        }
    }
}

impl Serialize for RequestPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, field) in &self.0 {
            map.serialize_entry(key, field)?;
        }
        map.end()
    }
}

/// Compose a request payload: base fields, then `additional`, then `options` in order.
pub fn compose(
    mut base: RequestPayload,
    additional: Option<Map<String, Value>>,
    options: impl IntoIterator<Item = BmpOption>,
) -> RequestPayload {
    if let Some(fields) = additional {
        base.merge_fields(fields);
    }
    base.apply(options);
    base
}

/// In-place payload mutator used by sensor calls.
pub struct BmpOption(Box<dyn FnOnce(&mut RequestPayload) + Send>);

impl BmpOption {
    /// Wrap a mutator.
    pub fn new(f: impl FnOnce(&mut RequestPayload) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Run the mutator.
    pub fn apply(self, payload: &mut RequestPayload) {
        (self.0)(payload);
    }
}

impl fmt::Debug for BmpOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BmpOption(..)")
    }
}

/// Attach a DCI script, base64 encoded, as `dciScriptBase64`.
pub fn with_dci_script(script: &[u8]) -> BmpOption {
    with_option("dciScriptBase64", STANDARD.encode(script))
}

/// Ask the service to use its mocked DCI script.
pub fn with_mocked_dci_script() -> BmpOption {
    with_option("dciScriptBase64", "mock")
}

/// Attach raw params, base64 encoded, as `paramsBase64`.
pub fn with_params(params: &[u8]) -> BmpOption {
    with_option("paramsBase64", STANDARD.encode(params))
}

/// Set `language`.
pub fn with_language(language: impl Into<String>) -> BmpOption {
    with_option("language", language.into())
}

/// Set `appVersion`.
pub fn with_app_version(app_version: impl Into<String>) -> BmpOption {
    with_option("appVersion", app_version.into())
}

/// Set `appVersionCode`.
pub fn with_app_version_code(app_version_code: impl Into<String>) -> BmpOption {
    with_option("appVersionCode", app_version_code.into())
}

/// Override the `session` field.
pub fn with_session(session: SessionState) -> BmpOption {
    BmpOption::new(move |payload| payload.set_session(session))
}

/// Set an arbitrary field.
pub fn with_option(key: impl Into<String>, value: impl Into<Value>) -> BmpOption {
    let key = key.into();
    let value = value.into();
    BmpOption::new(move |payload| payload.insert(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_base_fields() {
        let payload = RequestPayload::new("3.3.1", "com.example.app");
        assert_eq!(payload.get("bmpVersion"), Some(json!("3.3.1")));
        assert_eq!(payload.get("appPackage"), Some(json!("com.example.app")));
        assert!(payload.get("session").is_none());
    }

    #[test]
    fn test_with_session_embeds_state_verbatim() {
        let raw = r#"{"startMillis":1.0e3,"androidId":"abc"}"#;
        let state: SessionState = serde_json::from_str(raw).unwrap();
        let payload = RequestPayload::new("1", "pkg").with_session(&state);

        let body = String::from_utf8(payload.to_bytes().unwrap().to_vec()).unwrap();
        assert_eq!(
            body,
            format!(r#"{{"bmpVersion":"1","appPackage":"pkg","session":{raw}}}"#)
        );
    }

    #[test]
    fn test_option_helpers() {
        let payload = compose(
            RequestPayload::new("1", "pkg"),
            None,
            vec![
                with_dci_script(b"hello"),
                with_params(b"{}"),
                with_language("en"),
                with_app_version("2.0"),
                with_app_version_code("200"),
            ],
        );

        assert_eq!(payload.get("dciScriptBase64"), Some(json!("aGVsbG8=")));
        assert_eq!(payload.get("paramsBase64"), Some(json!("e30=")));
        assert_eq!(payload.get("language"), Some(json!("en")));
        assert_eq!(payload.get("appVersion"), Some(json!("2.0")));
        assert_eq!(payload.get("appVersionCode"), Some(json!("200")));
    }

    #[test]
    fn test_later_option_wins() {
        let payload = compose(
            RequestPayload::new("1", "pkg"),
            None,
            vec![with_dci_script(b"real"), with_mocked_dci_script()],
        );
        assert_eq!(payload.get("dciScriptBase64"), Some(json!("mock")));
    }

    #[test]
    fn test_options_can_overwrite_base_fields() {
        let payload = compose(
            RequestPayload::new("1", "pkg"),
            None,
            vec![with_option("bmpVersion", "2"), with_session(SessionState::default())],
        );
        assert_eq!(payload.get("bmpVersion"), Some(json!("2")));
        assert_eq!(payload.get("session"), Some(json!({})));
    }

    #[test]
    fn test_additional_fields_merge_then_options() {
        let mut extra = serde_json::Map::new();
        extra.insert("language".to_string(), json!("de"));
        extra.insert("deviceHint".to_string(), json!({"model": "Pixel 8"}));

        let payload = compose(
            RequestPayload::new("1", "pkg"),
            Some(extra),
            vec![with_language("en")],
        );

        assert_eq!(payload.get("language"), Some(json!("en")));
        assert_eq!(payload.get("deviceHint"), Some(json!({"model": "Pixel 8"})));
    }

    #[test]
    fn test_to_bytes_is_json_object() {
        let payload = RequestPayload::new("1", "pkg");
        let parsed: Value = serde_json::from_slice(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, json!({"bmpVersion": "1", "appPackage": "pkg"}));
    }

    proptest! {
        #[test]
        fn prop_last_write_wins(
            writes in proptest::collection::vec(("[a-d]", any::<i64>()), 0..24)
        ) {
            let options: Vec<BmpOption> = writes
                .iter()
                .map(|(key, value)| with_option(key.clone(), *value))
                .collect();

            let payload = compose(RequestPayload::default(), None, options);

            for key in ["a", "b", "c", "d"] {
                let expected = writes.iter().rev().find(|(k, _)| k == key).map(|(_, v)| json!(v));
                prop_assert_eq!(payload.get(key), expected);
            }
        }
    }
}
