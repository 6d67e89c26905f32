use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::http::Response;
use axum::http::Uri;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::cookie::CookiePolicy;
use super::handlers::forgot_password::forgot_password;
use super::handlers::login::login;
use super::handlers::me::me;
use super::handlers::purge_principals::purge_principals;
use super::handlers::reset_password::reset_password;
use super::handlers::signup::signup;
use super::handlers::update_password::update_password;
use super::handlers::ApiError;
use super::handlers::ErrorNormalizer;
use super::middleware::protect;
use super::middleware::restrict;
use super::middleware::RoleSet;
use super::middleware::RouteGuard;
use crate::account::errors::AccountError;
use crate::account::models::Role;
use crate::account::ports::AccountServicePort;

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<dyn AccountServicePort>,
    pub cookies: CookiePolicy,
    pub errors: ErrorNormalizer,
}

pub fn create_router(
    account_service: Arc<dyn AccountServicePort>,
    cookies: CookiePolicy,
    errors: ErrorNormalizer,
) -> Router {
    let state = AppState {
        account_service,
        cookies,
        errors,
    };

    let public_routes = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:token", patch(reset_password));

    let protected_routes = Router::new()
        .route("/auth/me", get(me))
        .route("/auth/update-password", patch(update_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), protect));

    // Outermost layer runs first: protect, then the role restriction.
    let admin_routes = Router::new()
        .route("/auth/principals", delete(purge_principals))
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::new(RoleSet::new([Role::Admin]), state.errors.clone()),
            restrict,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), protect));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            // Headers carry bearer tokens; they stay out of the span.
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .fallback(route_not_found)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn route_not_found(State(state): State<AppState>, uri: Uri) -> ApiError {
    state
        .errors
        .normalize(AccountError::RouteNotFound(uri.path().to_string()))
}
