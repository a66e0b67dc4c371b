use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use secrecy::Secret;
use serde::Deserialize;

use keygate_application::{AuthService, DeleteSessionRequest};

use super::{MessageResponse, error::ApiError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSessionBody {
    pub name: String,
    pub password: Secret<String>,
    pub refresh_token: String,
}

#[tracing::instrument(name = "Delete session", skip_all)]
pub async fn delete_session(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<DeleteSessionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service
        .delete_session(DeleteSessionRequest {
            name: body.name,
            password: body.password,
            refresh_token: body.refresh_token,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: response.message,
    }))
}
