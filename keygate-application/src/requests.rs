use secrecy::Secret;

/// Typed request values handed in by the transport layer. Plaintext
/// passwords stay wrapped until the moment they are salted.

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub name: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct RefreshTokensRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct ChangeNameRequest {
    pub name: String,
    pub password: Secret<String>,
    pub new_name: String,
}

#[derive(Debug, Clone)]
pub struct ChangePasswordRequest {
    pub name: String,
    pub password: Secret<String>,
    pub new_password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct DeleteUserRequest {
    pub name: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct DeleteSessionRequest {
    pub name: String,
    pub password: Secret<String>,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct CheckAccessTokenRequest {
    pub access_token: String,
}
