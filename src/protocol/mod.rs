//! BMP session-continuation protocol.
//!
//! Every BMP interaction is a short exchange driven by an opaque,
//! server-issued session value:
//!
//! ```text
//! Client                                  BMP service
//!    |                                         |
//!    |------ GET  /bmp/{platform}/init ------->|
//!    |<----- {device, session} ----------------|  session #0
//!    |                                         |
//!    |------ POST /bmp/{platform}/sensor ----->|  {bmpVersion, appPackage,
//!    |                                         |   session #0, ...options}
//!    |<----- {sensor, session, reportData} ----|  session #1
//!    |                                         |
//!    |------ POST /bmp/feedback -------------->|  {valid, reportData}
//!    |<----- 200 (empty) ----------------------|
//! ```
//!
//! The session sent on call N is exactly the session returned by call N-1.
//!
//! ## Outcomes
//!
//! | Condition                                   | Outcome                |
//! |---------------------------------------------|------------------------|
//! | send or body read failed                    | `Transport`            |
//! | non-200, body is `{"error": "X"}`           | `Remote("X")`          |
//! | non-200, any other body                     | `MalformedResponse`    |
//! | 200, non-empty top-level `error`            | `Remote`               |
//! | 200, body does not match the call's schema  | `MalformedResponse`    |
//! | 200, sensor call with empty `sensor`        | `Remote("sensor is empty")` |
//! | 200 otherwise                               | success                |
//!
//! ## Modules
//!
//! - `compose`: request payload building and sensor options
//! - `session`: the opaque session value
//! - `classify`: status/body classification

mod classify;
mod compose;
mod session;

pub use classify::{classify, classify_empty};
pub use compose::{
    compose, with_app_version, with_app_version_code, with_dci_script, with_language,
    with_mocked_dci_script, with_option, with_params, with_session, BmpOption, RequestPayload,
};
pub use session::SessionState;

/// Request key for the protocol version
pub const BMP_VERSION_KEY: &str = "bmpVersion";

/// Request key for the application package
pub const APP_PACKAGE_KEY: &str = "appPackage";

/// Request/response key for the session value
pub const SESSION_KEY: &str = "session";

/// Session key holding the start time in milliseconds
pub const START_MILLIS_KEY: &str = "startMillis";

/// Response key for a remote error description
pub const ERROR_KEY: &str = "error";

/// Feedback endpoint
pub const FEEDBACK_PATH: &str = "/bmp/feedback";

/// Init endpoint for a platform
pub fn init_path(platform: &str) -> String {
    format!("/bmp/{platform}/init")
}

/// Sensor endpoint for a platform
pub fn sensor_path(platform: &str) -> String {
    format!("/bmp/{platform}/sensor")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(init_path("android"), "/bmp/android/init");
        assert_eq!(sensor_path("ios"), "/bmp/ios/sensor");
    }
}
