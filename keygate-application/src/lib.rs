pub mod auth_service;
pub mod requests;
pub mod responses;

// Re-export commonly used types for convenience
pub use auth_service::{AuthService, TokenLifetimes};
pub use requests::{
    ChangeNameRequest, ChangePasswordRequest, CheckAccessTokenRequest, DeleteSessionRequest,
    DeleteUserRequest, LoginRequest, RefreshTokensRequest, RegisterRequest,
};
pub use responses::{
    ChangeNameResponse, ChangePasswordResponse, CheckAccessTokenResponse, DeleteSessionResponse,
    DeleteUserResponse, LoginResponse, RefreshTokensResponse, RegisterResponse,
};
