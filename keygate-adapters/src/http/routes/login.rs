use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use secrecy::Secret;
use serde::Deserialize;

use keygate_application::{AuthService, LoginRequest};

use super::{TokenPairResponse, error::ApiError};

#[derive(Deserialize)]
pub struct LoginBody {
    pub name: String,
    pub password: Secret<String>,
}

#[tracing::instrument(name = "Login", skip_all)]
pub async fn login(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service
        .login(LoginRequest {
            name: body.name,
            password: body.password,
        })
        .await?;

    Ok(Json(TokenPairResponse {
        refresh_token: response.refresh_token,
        access_token: response.access_token,
    }))
}
