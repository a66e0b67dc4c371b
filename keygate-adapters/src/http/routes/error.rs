use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keygate_core::AuthError;

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Transport-side rendering of `AuthError`.
///
/// Invariant violations are safe to show verbatim. Infrastructure failures
/// are logged with full detail server-side and surfaced only as a
/// correlation id.
pub struct ApiError(AuthError);

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            AuthError::InvariantViolation(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: message }),
            )
                .into_response(),
            err => {
                let correlation_id = Uuid::new_v4();
                tracing::error!(%correlation_id, error = %err, "infrastructure failure");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: format!(
                            "request {correlation_id} failed, \
                             please send this id to technical support"
                        ),
                    }),
                )
                    .into_response()
            }
        }
    }
}
