//! JSON REST handlers for devices: snapshots and operator commands.

use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use harvestguard_app::ports::{Clock, SnapshotRepository};
use harvestguard_domain::decision::{LockReason, ShakerOutcome};
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::snapshot::DeviceSnapshot;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for the shaker toggle.
#[derive(Debug, Deserialize)]
pub struct ShakerRequest {
    #[serde(alias = "desiredOn")]
    pub desired_on: bool,
}

/// Response body for the shaker toggle.
///
/// A rejected request is still a `200`: `accepted` is `false` and `reason`
/// says why, while `device` shows the unchanged state.
#[derive(Debug, Serialize)]
pub struct ShakerResponseBody {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<LockReason>,
    pub device: DeviceSnapshot,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<DeviceSnapshot>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the endpoints returning one device.
pub enum DeviceResponse {
    Ok(Json<DeviceSnapshot>),
}

impl IntoResponse for DeviceResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the shaker endpoint.
pub enum ShakerResponse {
    Ok(Json<ShakerResponseBody>),
}

impl IntoResponse for ShakerResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/devices`
pub async fn list<R, C>(State(state): State<AppState<R, C>>) -> ListResponse
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    ListResponse::Ok(Json(state.device_service.list_snapshots().await))
}

/// `GET /api/devices/{id}`
pub async fn get<R, C>(
    State(state): State<AppState<R, C>>,
    Path(id): Path<String>,
) -> Result<DeviceResponse, ApiError>
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    let device_id = DeviceId::from_str(&id)?;
    let snapshot = state.device_service.get_snapshot(&device_id).await?;
    Ok(DeviceResponse::Ok(Json(snapshot)))
}

/// `PUT /api/devices/{id}/shaker`
pub async fn toggle_shaker<R, C>(
    State(state): State<AppState<R, C>>,
    Path(id): Path<String>,
    payload: Result<Json<ShakerRequest>, JsonRejection>,
) -> Result<ShakerResponse, ApiError>
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    let device_id = DeviceId::from_str(&id)?;
    let Json(req) = payload?;
    let toggle = state
        .device_service
        .toggle_shaker(&device_id, req.desired_on)
        .await?;
    let reason = match toggle.outcome {
        ShakerOutcome::Rejected(reason) => Some(reason),
        ShakerOutcome::Applied | ShakerOutcome::NotRequested => None,
    };
    Ok(ShakerResponse::Ok(Json(ShakerResponseBody {
        accepted: toggle.accepted(),
        reason,
        device: toggle.snapshot,
    })))
}

/// `POST /api/devices/{id}/stop-pour`
pub async fn stop_pour<R, C>(
    State(state): State<AppState<R, C>>,
    Path(id): Path<String>,
) -> Result<DeviceResponse, ApiError>
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    let device_id = DeviceId::from_str(&id)?;
    let snapshot = state.device_service.stop_pour(&device_id).await?;
    Ok(DeviceResponse::Ok(Json(snapshot)))
}

/// `DELETE /api/devices/{id}`
pub async fn delete<R, C>(
    State(state): State<AppState<R, C>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    let device_id = DeviceId::from_str(&id)?;
    state.device_service.deregister(&device_id).await?;
    Ok(DeleteResponse::NoContent)
}
