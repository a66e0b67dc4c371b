use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use secrecy::Secret;
use serde::Deserialize;

use keygate_application::{AuthService, ChangeNameRequest};

use super::{MessageResponse, error::ApiError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNameBody {
    pub name: String,
    pub password: Secret<String>,
    pub new_name: String,
}

#[tracing::instrument(name = "Change name", skip_all)]
pub async fn change_name(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<ChangeNameBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service
        .change_name(ChangeNameRequest {
            name: body.name,
            password: body.password,
            new_name: body.new_name,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: response.message,
    }))
}
