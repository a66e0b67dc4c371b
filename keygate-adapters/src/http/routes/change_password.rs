use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use secrecy::Secret;
use serde::Deserialize;

use keygate_application::{AuthService, ChangePasswordRequest};

use super::{MessageResponse, error::ApiError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    pub name: String,
    pub password: Secret<String>,
    pub new_password: Secret<String>,
}

#[tracing::instrument(name = "Change password", skip_all)]
pub async fn change_password(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<ChangePasswordBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service
        .change_password(ChangePasswordRequest {
            name: body.name,
            password: body.password,
            new_password: body.new_password,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: response.message,
    }))
}
