//! Telemetry ingestion endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use harvestguard_app::ports::{Clock, SnapshotRepository};
use harvestguard_app::services::device_service::IngestTelemetry;
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::snapshot::DeviceSnapshot;
use harvestguard_domain::telemetry::TelemetryReading;
use harvestguard_domain::time::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

/// Reading pushed by a dryer.
///
/// Field names are snake case; the camel case names sent by the firmware
/// are accepted as aliases.
#[derive(Debug, Deserialize)]
pub struct TelemetryRequest {
    #[serde(alias = "deviceId")]
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(alias = "isRainDetected")]
    pub is_rain_detected: bool,
    #[serde(default, alias = "isSunny")]
    pub is_sunny: bool,
    /// Device-side time of the reading.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// Possible responses from the ingest endpoint.
pub enum IngestResponse {
    Ok(Json<DeviceSnapshot>),
}

impl IntoResponse for IngestResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/telemetry`
pub async fn ingest<R, C>(
    State(state): State<AppState<R, C>>,
    payload: Result<Json<TelemetryRequest>, JsonRejection>,
) -> Result<IngestResponse, ApiError>
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    let Json(req) = payload?;
    let command = IngestTelemetry {
        device_id: DeviceId::new(&req.device_id)?,
        reading: TelemetryReading {
            temperature: req.temperature,
            humidity: req.humidity,
            is_rain_detected: req.is_rain_detected,
            is_sunny: req.is_sunny,
        },
        reported_at: req.timestamp,
    };
    let snapshot = state.device_service.ingest(command).await?;
    Ok(IngestResponse::Ok(Json(snapshot)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_firmware_field_names() {
        let req: TelemetryRequest = serde_json::from_value(serde_json::json!({
            "deviceId": "dryer-01",
            "temperature": 41.2,
            "humidity": 15.5,
            "isRainDetected": true,
            "isSunny": false,
            "timestamp": "2024-06-01T10:00:00Z",
        }))
        .unwrap();

        assert_eq!(req.device_id, "dryer-01");
        assert!(req.is_rain_detected);
        assert!(req.timestamp.is_some());
    }

    #[test]
    fn should_default_optional_fields_when_absent() {
        let req: TelemetryRequest = serde_json::from_value(serde_json::json!({
            "device_id": "dryer-01",
            "temperature": 30.0,
            "humidity": 20.0,
            "is_rain_detected": false,
        }))
        .unwrap();

        assert!(!req.is_sunny);
        assert!(req.timestamp.is_none());
    }

    #[test]
    fn should_reject_request_when_humidity_missing() {
        let result: Result<TelemetryRequest, _> = serde_json::from_value(serde_json::json!({
            "device_id": "dryer-01",
            "temperature": 30.0,
            "is_rain_detected": false,
        }));
        assert!(result.is_err());
    }
}
