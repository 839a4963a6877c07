//! BMP calls per platform.
//!
//! Two ways to drive an interaction, sharing the same request logic:
//!
//! - **Value passing**: [`Client::bmp_init`], [`Client::bmp_sensor`] and
//!   [`Client::bmp_feedback`] take the previous session and return the next.
//!   [`Client::bmp_sensor_sessionless`] skips init altogether and returns the
//!   device inline.
//! - **Stateful handle**: [`BmpSession`] holds the session and replaces it
//!   after each successful sensor call.
//!
//! ```rust,ignore
//! use bmp::{with_language, Client};
//!
//! let client = Client::new_remote("api-key")?;
//! let (device, mut session) = client.android_bmp_init().await?;
//! println!("{} / {}", device.model, session.android_id());
//!
//! let (sensor, report) = session
//!     .sensor("3.3.1", "com.example.app", vec![with_language("en")])
//!     .await?;
//! session.feedback(true, &report).await?;
//! ```
//!
//! [`Client::bmp_init`]: crate::client::Client::bmp_init
//! [`Client::bmp_sensor`]: crate::client::Client::bmp_sensor
//! [`Client::bmp_feedback`]: crate::client::Client::bmp_feedback
//! [`Client::bmp_sensor_sessionless`]: crate::client::Client::bmp_sensor_sessionless

mod driver;
mod handle;
mod platform;

pub use driver::{SensorOutcome, SessionlessOutcome};
pub use handle::BmpSession;
pub use platform::{
    Android, AndroidDevice, InitQuery, Ios, IosDevice, IosInitQuery, Platform, PlatformKind,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque report produced by a sensor call and returned verbatim in feedback.
///
/// Always a string on the wire; the client never looks inside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportData(String);

impl ReportData {
    /// Borrow the raw report.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the raw report.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for ReportData {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ReportData {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for ReportData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
