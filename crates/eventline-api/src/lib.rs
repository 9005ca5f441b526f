//! Eventline API - REST server
//!
//! HTTP surface of the Eventline backend. The auth subsystem lives in
//! [`auth`]; every route is wrapped by the transparent token refresh
//! middleware so an expired-but-refreshable session never fails a request.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::{middleware as axum_middleware, routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::logout_handler,
        handlers::auth::me_handler,
        handlers::auth::request_password_reset_handler,
        handlers::auth::reset_password_handler,
        handlers::health::health_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::RefreshRequest,
        auth::RequestPasswordResetRequest,
        auth::ResetPasswordRequest,
        auth::AuthResponse,
        auth::UserInfo,
        auth::TokenPair,
        handlers::auth::MessageResponse,
        error::ApiError,
    )),
    tags(
        (name = "auth", description = "Authentication and session management"),
        (name = "health", description = "Service health probes"),
    )
)]
pub struct ApiDoc;

/// Assemble the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::refresh_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for browser clients
///
/// Credentials are allowed (the cookie carrier needs them), so origins must
/// be listed explicitly. The token response headers are exposed so
/// programmatic clients can read a silently rotated pair.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(auth::REFRESH_TOKEN_HEADER),
        ])
        .expose_headers([
            header::HeaderName::from_static(auth::ACCESS_TOKEN_HEADER),
            header::HeaderName::from_static(auth::REFRESH_TOKEN_HEADER),
        ])
        .allow_credentials(true)
}

/// Router over default configuration and in-memory collaborators
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    use auth::{InMemoryIdentityStore, LogMailer};
    use eventline_core::AppConfig;

    let state = Arc::new(AppState::new(
        AppConfig::default(),
        Arc::new(InMemoryIdentityStore::new()),
        Arc::new(LogMailer),
    ));
    create_router(state)
}
