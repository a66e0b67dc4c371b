use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;

use keygate_application::{AuthService, RefreshTokensRequest};

use super::{TokenPairResponse, error::ApiError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokensBody {
    pub refresh_token: String,
}

#[tracing::instrument(name = "Refresh tokens", skip_all)]
pub async fn refresh_tokens(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<RefreshTokensBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service
        .refresh_tokens(RefreshTokensRequest {
            refresh_token: body.refresh_token,
        })
        .await?;

    Ok(Json(TokenPairResponse {
        refresh_token: response.refresh_token,
        access_token: response.access_token,
    }))
}
