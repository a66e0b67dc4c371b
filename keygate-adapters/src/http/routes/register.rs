use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use secrecy::Secret;
use serde::Deserialize;

use keygate_application::{AuthService, RegisterRequest};

use super::{MessageResponse, error::ApiError};

#[derive(Deserialize)]
pub struct RegisterBody {
    pub name: String,
    pub password: Secret<String>,
}

#[tracing::instrument(name = "Register", skip_all)]
pub async fn register(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service
        .register(RegisterRequest {
            name: body.name,
            password: body.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: response.message,
        }),
    ))
}
