//! Value-passing BMP calls.
//!
//! These methods keep no state: the caller passes the previous
//! [`SessionState`] in and receives the next one back.

use serde::{Deserialize, Serialize};

use super::platform::{InitQuery, Platform};
use super::ReportData;
use crate::client::Client;
use crate::error::{BmpError, Result};
use crate::protocol::{
    classify, classify_empty, compose, init_path, sensor_path, BmpOption, RequestPayload,
    SessionState, FEEDBACK_PATH,
};

/// Result of a sensor call that continued a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorOutcome {
    /// Sensor identifier
    pub sensor: String,
    /// Session to send on the next call
    pub session: SessionState,
    /// Opaque report data for the feedback call
    pub report_data: ReportData,
}

/// Result of a sessionless sensor call.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionlessOutcome<D> {
    /// Sensor identifier
    pub sensor: String,
    /// Device the sensor was generated for
    pub device: D,
    /// Session issued by the service (empty if none)
    pub session: SessionState,
    /// Opaque report data for the feedback call
    pub report_data: ReportData,
}

#[derive(Deserialize)]
struct InitResponse<D> {
    device: D,
    session: SessionState,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SensorResponse {
    #[serde(default)]
    sensor: String,
    #[serde(default)]
    session: Option<SessionState>,
    #[serde(default)]
    report_data: ReportData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionlessResponse<D> {
    #[serde(default)]
    sensor: String,
    #[serde(default)]
    session: Option<SessionState>,
    device: D,
    #[serde(default)]
    report_data: ReportData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackRequest<'a> {
    valid: bool,
    report_data: &'a ReportData,
}

fn require_sensor(sensor: String) -> Result<String> {
    if sensor.is_empty() {
        return Err(BmpError::remote("sensor is empty"));
    }
    Ok(sensor)
}

impl Client {
    /// Start an interaction: fetch a device and its initial session.
    pub async fn bmp_init<P: Platform>(
        &self,
        query: &P::InitQuery,
    ) -> Result<(P::Device, SessionState)> {
        let call = format!("{} init", P::NAME);
        let request = self.get(&init_path(P::NAME), &query.query_pairs())?;
        let response = self.execute(request).await?;

        let body: InitResponse<P::Device> = classify(&call, &response)?;
        tracing::debug!(platform = P::NAME, "BMP session initialized");

        Ok((body.device, body.session))
    }

    /// Submit sensor data, continuing `session`.
    ///
    /// The returned outcome carries the session for the next call. If the
    /// service omits `session`, the one passed in is handed back unchanged.
    pub async fn bmp_sensor<P: Platform>(
        &self,
        bmp_version: &str,
        app_package: &str,
        session: &SessionState,
        options: impl IntoIterator<Item = BmpOption>,
    ) -> Result<SensorOutcome> {
        let call = format!("{} sensor", P::NAME);
        let payload = compose(
            RequestPayload::new(bmp_version, app_package).with_session(session),
            None,
            options,
        );
        let request = self.post_json(&sensor_path(P::NAME), payload.to_bytes()?)?;
        let response = self.execute(request).await?;

        let body: SensorResponse = classify(&call, &response)?;
        let sensor = require_sensor(body.sensor)?;

        Ok(SensorOutcome {
            sensor,
            session: body.session.unwrap_or_else(|| session.clone()),
            report_data: body.report_data,
        })
    }

    /// Submit sensor data without a prior init call.
    ///
    /// `additional` is merged flat over the base fields (no order among its
    /// own entries); `options` then run in order.
    pub async fn bmp_sensor_sessionless<P: Platform>(
        &self,
        bmp_version: &str,
        app_package: &str,
        additional: Option<serde_json::Map<String, serde_json::Value>>,
        options: impl IntoIterator<Item = BmpOption>,
    ) -> Result<SessionlessOutcome<P::Device>> {
        let call = format!("{} sensor (sessionless)", P::NAME);
        let payload = compose(
            RequestPayload::new(bmp_version, app_package),
            additional,
            options,
        );
        let request = self.post_json(&sensor_path(P::NAME), payload.to_bytes()?)?;
        let response = self.execute(request).await?;

        let body: SessionlessResponse<P::Device> = classify(&call, &response)?;
        let sensor = require_sensor(body.sensor)?;

        Ok(SessionlessOutcome {
            sensor,
            device: body.device,
            session: body.session.unwrap_or_default(),
            report_data: body.report_data,
        })
    }

    /// Report whether a previously obtained result was valid.
    pub async fn bmp_feedback(&self, valid: bool, report_data: &ReportData) -> Result<()> {
        let body = serde_json::to_vec(&FeedbackRequest { valid, report_data })
            .map_err(|e| BmpError::transport("error while marshalling request", e))?;
        let request = self.post_json(FEEDBACK_PATH, body.into())?;
        let response = self.execute(request).await?;

        classify_empty("feedback", &response)
    }
}
