//! API error type and its JSON response

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::combat::CombatError;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP-layer error: a domain failure, a missing resource, or a request axum
/// could not decode
#[derive(Debug)]
pub enum ApiError {
    Combat(CombatError),
    NotFound(String),
    Body(JsonRejection),
    Path(PathRejection),
}

impl From<CombatError> for ApiError {
    fn from(err: CombatError) -> Self {
        ApiError::Combat(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Path(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Combat(err @ CombatError::CombatNotFound(_))
            | ApiError::Combat(err @ CombatError::InitiativeNotFound { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ApiError::Combat(CombatError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Combat(CombatError::Database(e)) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Body(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Path(rejection) => (rejection.status(), rejection.body_text()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CombatError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_combat_not_found_maps_to_404() {
        assert_eq!(
            status_of(CombatError::CombatNotFound(3)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_initiative_not_found_maps_to_404() {
        assert_eq!(
            status_of(CombatError::InitiativeNotFound {
                combat_id: 1,
                initiative_id: 2,
            }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(CombatError::Validation("name must not be empty".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_database_maps_to_500() {
        assert_eq!(
            status_of(CombatError::Database(sqlx::Error::PoolTimedOut)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
