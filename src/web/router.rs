//! Request routing and middleware.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::cron::CrontabInstaller;
use crate::web::config::AgentConfig;
use crate::web::handlers;

/// Shared request state: the immutable configuration and the
/// crontab-install seam.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub installer: Arc<dyn CrontabInstaller>,
}

/// Attach the permissive CORS headers to every response, and answer
/// OPTIONS on any path with a bare 204. Preflights never reach the routing
/// table, so the auth gate and the 404 fallback only see real requests.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return with_cors_headers(StatusCode::NO_CONTENT.into_response());
    }
    with_cors_headers(next.run(request).await)
}

fn with_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-Auth-Token"),
    );
    response
}

/// Build the agent's router.
///
/// Reads are open; POST handlers run the auth gate before any side effect.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/cron", get(handlers::cron_get).post(handlers::cron_post))
        .route("/wifi", get(handlers::wifi_get).post(handlers::wifi_post))
        .route("/reboot", post(handlers::reboot))
        .route("/discover", get(handlers::discover))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(cors))
        .with_state(state)
}
