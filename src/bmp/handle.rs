//! Stateful session handle.
//!
//! [`BmpSession`] wraps the value-passing calls and threads the session for
//! the caller. It is meant to be driven by one caller per interaction; share
//! it across tasks only behind external synchronization.

use std::fmt;
use std::marker::PhantomData;

use super::platform::{Android, AndroidDevice, Ios, IosDevice, IosInitQuery, Platform};
use super::ReportData;
use crate::client::Client;
use crate::error::Result;
use crate::protocol::{BmpOption, SessionState};

/// Session bound to a client, updated in place after each successful sensor call.
pub struct BmpSession<P: Platform> {
    client: Client,
    session: SessionState,
    _platform: PhantomData<P>,
}

impl<P: Platform> fmt::Debug for BmpSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BmpSession")
            .field("platform", &P::NAME)
            .field("client", &self.client)
            .field("session", &self.session)
            .finish()
    }
}

impl<P: Platform> BmpSession<P> {
    /// Resume an interaction from a previously obtained session.
    pub fn new(client: Client, session: SessionState) -> Self {
        Self {
            client,
            session,
            _platform: PhantomData,
        }
    }

    /// Device/session identifier, or `""` if the session has none.
    pub fn identifier(&self) -> String {
        self.session.string_field(P::IDENTIFIER_KEY)
    }

    /// Session start time in milliseconds, or 0.
    pub fn start_millis(&self) -> i64 {
        self.session.start_millis()
    }

    /// Current session value.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Give up the handle, keeping the session for manual threading.
    pub fn into_session(self) -> SessionState {
        self.session
    }

    /// Client this handle sends through.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Submit sensor data and return `(sensor, report_data)`.
    ///
    /// The held session is replaced only when the call succeeds; on any
    /// error it keeps its pre-call value.
    pub async fn sensor(
        &mut self,
        bmp_version: &str,
        app_package: &str,
        options: impl IntoIterator<Item = BmpOption>,
    ) -> Result<(String, ReportData)> {
        let outcome = self
            .client
            .bmp_sensor::<P>(bmp_version, app_package, &self.session, options)
            .await?;

        self.session = outcome.session;
        Ok((outcome.sensor, outcome.report_data))
    }

    /// Report whether a result obtained through this handle was valid.
    pub async fn feedback(&self, valid: bool, report_data: &ReportData) -> Result<()> {
        self.client.bmp_feedback(valid, report_data).await
    }
}

impl BmpSession<Android> {
    /// Android id carried in the session.
    pub fn android_id(&self) -> String {
        self.identifier()
    }
}

impl BmpSession<Ios> {
    /// Device UDID carried in the session.
    pub fn udid(&self) -> String {
        self.identifier()
    }
}

impl Client {
    /// Init an interaction and wrap its session in a handle.
    pub async fn bmp_start<P: Platform>(
        &self,
        query: &P::InitQuery,
    ) -> Result<(P::Device, BmpSession<P>)> {
        let (device, session) = self.bmp_init::<P>(query).await?;
        Ok((device, BmpSession::new(self.clone(), session)))
    }

    /// Android init returning a stateful handle.
    pub async fn android_bmp_init(&self) -> Result<(AndroidDevice, BmpSession<Android>)> {
        self.bmp_start::<Android>(&()).await
    }

    /// iOS init returning a stateful handle.
    pub async fn ios_bmp_init(
        &self,
        query: &IosInitQuery,
    ) -> Result<(IosDevice, BmpSession<Ios>)> {
        self.bmp_start::<Ios>(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::RecordingSender;
    use crate::protocol::with_language;
    use serde_json::json;

    const INIT_BODY: &str = r#"{"device":{"manufacturer":"Google","model":"Pixel 8"},
        "session":{"androidId":"abc","startMillis":1000}}"#;

    #[tokio::test]
    async fn test_handle_accessors_after_init() {
        let sender = RecordingSender::default();
        sender.respond(200, INIT_BODY);

        let (device, handle) = sender.client().android_bmp_init().await.unwrap();
        assert_eq!(device.model, "Pixel 8");
        assert_eq!(handle.android_id(), "abc");
        assert_eq!(handle.identifier(), "abc");
        assert_eq!(handle.start_millis(), 1000);
    }

    #[tokio::test]
    async fn test_handle_sensor_updates_state() {
        let sender = RecordingSender::default();
        sender.respond(200, INIT_BODY);
        sender.respond(
            200,
            r#"{"sensor":"s1","session":{"androidId":"abc","startMillis":2000},"reportData":"R"}"#,
        );
        sender.respond(
            200,
            r#"{"sensor":"s2","session":{"androidId":"abc","startMillis":3000},"reportData":"R2"}"#,
        );

        let (_, mut handle) = sender.client().android_bmp_init().await.unwrap();

        let (sensor, report) = handle
            .sensor("3.3.1", "com.example.app", vec![with_language("en")])
            .await
            .unwrap();
        assert_eq!(sensor, "s1");
        assert_eq!(report.as_str(), "R");
        assert_eq!(handle.start_millis(), 2000);

        handle.sensor("3.3.1", "com.example.app", Vec::new()).await.unwrap();

        // second sensor call carries the session returned by the first
        let sent = sender.last_json();
        assert_eq!(sent["session"], json!({"androidId": "abc", "startMillis": 2000}));
        assert_eq!(handle.start_millis(), 3000);
    }

    #[tokio::test]
    async fn test_handle_keeps_state_on_failure() {
        let sender = RecordingSender::default();
        sender.respond(200, INIT_BODY);
        sender.respond(400, r#"{"error":"throttled"}"#);
        sender.respond(200, "not json");
        sender.fail("timeout");
        sender.respond(200, r#"{"sensor":"","session":{"androidId":"other"}}"#);

        let (_, mut handle) = sender.client().android_bmp_init().await.unwrap();
        let before = handle.session().clone();

        for _ in 0..4 {
            assert!(handle.sensor("1", "pkg", Vec::new()).await.is_err());
            assert_eq!(handle.session(), &before);
        }
        assert_eq!(handle.android_id(), "abc");
    }

    #[tokio::test]
    async fn test_ios_handle_udid() {
        let sender = RecordingSender::default();
        sender.respond(200, r#"{"device":{"name":"iPhone"},"session":{"udid":"u-1","startMillis":"x"}}"#);

        let (_, handle) = sender
            .client()
            .ios_bmp_init(&IosInitQuery::default().with_model("iPhone15,2"))
            .await
            .unwrap();

        assert_eq!(handle.udid(), "u-1");
        assert_eq!(handle.start_millis(), 0);
        assert!(sender.requests()[0].url.ends_with("/bmp/ios/init?model=iPhone15%2C2"));
    }

    #[tokio::test]
    async fn test_resumed_handle_and_into_session() {
        let sender = RecordingSender::default();
        sender.respond(200, r#"{"sensor":"s1","session":{"udid":"next"},"reportData":"R"}"#);

        let session: SessionState = serde_json::from_str(r#"{"udid":"prev"}"#).unwrap();
        let mut handle = BmpSession::<Ios>::new(sender.client(), session);
        handle.sensor("1", "pkg", Vec::new()).await.unwrap();

        assert_eq!(handle.into_session().string_field("udid"), "next");
    }

    #[tokio::test]
    async fn test_handle_feedback() {
        let sender = RecordingSender::default();
        sender.respond(200, "");

        let handle = BmpSession::<Android>::new(sender.client(), SessionState::default());
        handle.feedback(true, &ReportData::from("R")).await.unwrap();
        assert_eq!(sender.last_json(), json!({"valid": true, "reportData": "R"}));
    }
}
