#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub refresh_token: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokensResponse {
    pub refresh_token: String,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNameResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePasswordResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteUserResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSessionResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckAccessTokenResponse {
    pub is_active: bool,
}
