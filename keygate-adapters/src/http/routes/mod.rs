pub mod change_name;
pub mod change_password;
pub mod check_access_token;
pub mod delete_session;
pub mod delete_user;
pub mod error;
pub mod login;
pub mod refresh_tokens;
pub mod register;

use serde::Serialize;

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub refresh_token: String,
    pub access_token: String,
}
