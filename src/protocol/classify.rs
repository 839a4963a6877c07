//! Response classification.
//!
//! Turns a raw status/body pair into either the decoded success schema or one
//! of the error categories in [`BmpError`].

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::ERROR_KEY;
use crate::client::HttpResponse;
use crate::error::{BmpError, Result};

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Classify a response whose success body is a JSON object of type `T`.
///
/// - non-200: the body must be `{"error": "..."}`, giving [`BmpError::Remote`];
///   anything else is [`BmpError::MalformedResponse`].
/// - 200 with a non-empty top-level `error` string: [`BmpError::Remote`].
/// - 200 otherwise: the body decodes into `T` or is malformed.
pub fn classify<T: DeserializeOwned>(call: &str, response: &HttpResponse) -> Result<T> {
    if response.status != StatusCode::OK {
        return Err(rejection(call, response));
    }

    let value: Value = serde_json::from_slice(&response.body)
        .map_err(|e| BmpError::malformed(format!("{call}: error while unmarshalling response"), e))?;

    if let Some(description) = value
        .get(ERROR_KEY)
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
    {
        tracing::debug!(call, error = description, "BMP call rejected");
        return Err(BmpError::remote(description));
    }

    // decode from the bytes so raw session text is captured as sent
    serde_json::from_slice(&response.body)
        .map_err(|e| BmpError::malformed(format!("{call}: error while unmarshalling response"), e))
}

/// Classify a response whose success body is ignored.
pub fn classify_empty(call: &str, response: &HttpResponse) -> Result<()> {
    if response.status != StatusCode::OK {
        return Err(rejection(call, response));
    }
    Ok(())
}

fn rejection(call: &str, response: &HttpResponse) -> BmpError {
    match serde_json::from_slice::<ErrorBody>(&response.body) {
        Ok(body) => {
            tracing::debug!(call, status = %response.status, error = %body.error, "BMP call rejected");
            BmpError::remote(body.error)
        },
        Err(e) => BmpError::malformed(
            format!("{call}: error while unmarshalling error response (status {})", response.status),
            e,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        sensor: String,
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(StatusCode::from_u16(status).unwrap(), body.to_string())
    }

    #[test]
    fn test_success_decodes() {
        let sample: Sample = classify("sensor", &response(200, r#"{"sensor":"s1"}"#)).unwrap();
        assert_eq!(sample.sensor, "s1");
    }

    #[test]
    fn test_non_ok_with_error_body_is_remote() {
        let err = classify::<Sample>("sensor", &response(400, r#"{"error":"X"}"#)).unwrap_err();
        assert_eq!(err.remote_description(), Some("X"));
    }

    #[test]
    fn test_non_ok_with_empty_error_is_remote() {
        let err = classify::<Sample>("sensor", &response(500, r#"{"error":""}"#)).unwrap_err();
        assert_eq!(err.remote_description(), Some(""));
    }

    #[test]
    fn test_non_ok_with_garbage_body_is_malformed() {
        let err = classify::<Sample>("sensor", &response(502, "<html>Bad Gateway</html>")).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("status 502"));
    }

    #[test]
    fn test_non_ok_without_error_field_is_malformed() {
        let err = classify::<Sample>("sensor", &response(404, r#"{"message":"nope"}"#)).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_ok_with_error_field_is_remote() {
        let err = classify::<Sample>(
            "ios init",
            &response(200, r#"{"error":"no matching device available"}"#),
        )
        .unwrap_err();
        assert_eq!(err.remote_description(), Some("no matching device available"));
    }

    #[test]
    fn test_ok_with_empty_error_field_is_ignored() {
        let sample: Sample =
            classify("sensor", &response(200, r#"{"error":"","sensor":"s2"}"#)).unwrap();
        assert_eq!(sample.sensor, "s2");
    }

    #[test]
    fn test_ok_with_wrong_schema_is_malformed() {
        let err = classify::<Sample>("sensor", &response(200, r#"{"sensor":7}"#)).unwrap_err();
        assert!(err.is_malformed());

        let err = classify::<Sample>("sensor", &response(200, "")).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_classify_empty() {
        assert!(classify_empty("feedback", &response(200, "")).is_ok());

        let err = classify_empty("feedback", &response(400, r#"{"error":"bad report"}"#)).unwrap_err();
        assert_eq!(err.remote_description(), Some("bad report"));

        let err = classify_empty("feedback", &response(400, "")).unwrap_err();
        assert!(err.is_malformed());
    }
}
