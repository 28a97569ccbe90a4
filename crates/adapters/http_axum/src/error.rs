//! HTTP error response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use harvestguard_domain::error::{HarvestGuardError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Every failure an API endpoint can answer with, rendered as `{"error": ..}`.
#[derive(Debug)]
pub enum ApiError {
    Domain(HarvestGuardError),
    /// The body is missing, not JSON, or not the shape the endpoint expects.
    Body(JsonRejection),
}

impl From<HarvestGuardError> for ApiError {
    fn from(err: HarvestGuardError) -> Self {
        Self::Domain(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Domain(HarvestGuardError::Validation(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Domain(HarvestGuardError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Domain(HarvestGuardError::UnknownDevice(_)) => StatusCode::NOT_FOUND,
            Self::Domain(HarvestGuardError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Body(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Domain(HarvestGuardError::Validation(err)) => err.to_string(),
            Self::Domain(HarvestGuardError::UnknownDevice(err)) => err.to_string(),
            Self::Domain(HarvestGuardError::Storage(err)) => {
                tracing::error!(error = %err, "storage error");
                "internal server error".to_string()
            }
            Self::Body(rejection) => {
                tracing::debug!(error = %rejection, "request body rejected");
                rejection.body_text()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvestguard_domain::error::UnknownDeviceError;
    use harvestguard_domain::id::DeviceId;

    #[test]
    fn should_map_validation_error_to_bad_request() {
        let err = ApiError::from(ValidationError::EmptyDeviceId);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_unknown_device_to_not_found() {
        let device_id = DeviceId::new("dryer-09").unwrap();
        let err = ApiError::from(HarvestGuardError::from(UnknownDeviceError::from(device_id)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn should_hide_storage_details_behind_internal_error() {
        let err = ApiError::from(HarvestGuardError::Storage("disk full".into()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
