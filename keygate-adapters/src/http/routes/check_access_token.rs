use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};

use keygate_application::{AuthService, CheckAccessTokenRequest};

use super::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAccessTokenBody {
    pub access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAccessTokenResult {
    pub is_active: bool,
}

#[tracing::instrument(name = "Check access token", skip_all)]
pub async fn check_access_token(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<CheckAccessTokenBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service
        .check_access_token(CheckAccessTokenRequest {
            access_token: body.access_token,
        })
        .await?;

    Ok(Json(CheckAccessTokenResult {
        is_active: response.is_active,
    }))
}
