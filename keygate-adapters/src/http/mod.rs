pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::Request,
    routing::{delete, post},
};
use tower_http::trace::TraceLayer;
use tracing::Span;
use uuid::Uuid;

use keygate_application::AuthService;

use routes::{
    change_name, change_password, check_access_token, delete_session, delete_user, login,
    refresh_tokens, register,
};

/// Builds the HTTP surface over the auth service.
pub fn router(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/refresh-tokens", post(refresh_tokens::refresh_tokens))
        .route("/change-name", post(change_name::change_name))
        .route("/change-password", post(change_password::change_password))
        .route("/user", delete(delete_user::delete_user))
        .route("/session", delete(delete_session::delete_session))
        .route(
            "/check-access-token",
            post(check_access_token::check_access_token),
        )
        .with_state(service)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
}

// Every request gets its own id; infrastructure failures echo a separate
// correlation id to the caller, tied together by this span.
fn make_span_with_request_id(request: &Request<Body>) -> Span {
    let request_id = Uuid::new_v4();
    tracing::info_span!(
        "http_request",
        %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}
