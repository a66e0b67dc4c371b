use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use secrecy::Secret;
use serde::Deserialize;

use keygate_application::{AuthService, DeleteUserRequest};

use super::{MessageResponse, error::ApiError};

#[derive(Deserialize)]
pub struct DeleteUserBody {
    pub name: String,
    pub password: Secret<String>,
}

#[tracing::instrument(name = "Delete user", skip_all)]
pub async fn delete_user(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<DeleteUserBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service
        .delete_user(DeleteUserRequest {
            name: body.name,
            password: body.password,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: response.message,
    }))
}
