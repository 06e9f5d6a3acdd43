pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;
pub mod validation;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

/// Assembles the full application router: public auth flows, cookie-gated
/// session routes, the CSRF-guarded logout, Swagger UI, and the shared
/// request-id/trace/CORS layers.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/register", post(handlers::auth::register))
        .route("/api/v1/verify/{token}", post(handlers::auth::verify_email))
        .route("/api/v1/login", post(handlers::auth::login))
        .route("/api/v1/verify-otp", post(handlers::auth::verify_otp))
        .route("/api/v1/refresh", post(handlers::auth::refresh));

    let session_routes = Router::new()
        .route("/api/v1/refresh-csrf", post(handlers::auth::refresh_csrf))
        .route("/api/v1/profile", get(handlers::auth::profile))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ));

    // Logout mutates auth state, so it sits behind both gates; the CSRF
    // guard runs before the session check.
    let guarded_routes = Router::new()
        .route("/api/v1/logout", post(handlers::auth::logout))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::csrf::csrf_guard,
        ));

    let allowed_origin = state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:5173"));

    // Cookies require a credentialed CORS policy; a wildcard origin would
    // make browsers drop them.
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("csrf-token"),
            HeaderName::from_static("x-xsrf-token"),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(24 * 60 * 60));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(guarded_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_id::request_id))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
