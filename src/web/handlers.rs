//! HTTP handlers and the mutation auth gate.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use sysinfo::System;
use tracing::{error, info};

use crate::collectors::{self, attempt, network, system, wifi, MetricsSnapshot};
use crate::cron;
use crate::web::router::AppState;
use crate::{AGENT_VERSION, SERVICE_NAME};

/// Header carrying the shared secret on mutating requests
const AUTH_HEADER: &str = "x-auth-token";

/// Check the shared secret. An empty configured token admits everything.
///
/// Runs strictly before any mutator is invoked, so a failed check can never
/// leave a side effect behind.
fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    if !state.config.auth_enabled() {
        return true;
    }
    headers
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|token| token == state.config.token)
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}

/// Identity and liveness summary.
pub async fn health() -> Json<serde_json::Value> {
    let facts = attempt("system", system::collect()).await.unwrap_or_default();
    Json(json!({
        "hostname": System::host_name().unwrap_or_else(|| "unknown".to_string()),
        "uptime_seconds": System::uptime(),
        "agent_version": AGENT_VERSION,
        "ip_address": network::default_ip(),
        "model": facts.model,
        "os_name": facts.os_name,
        "os_version": facts.os_version,
        "kernel": facts.kernel,
        "architecture": facts.architecture,
        "timestamp": collectors::now_iso(),
    }))
}

/// One fresh metrics snapshot. Always 200; broken sensors surface as null
/// fields, never as an error.
pub async fn metrics() -> Json<MetricsSnapshot> {
    Json(MetricsSnapshot::gather().await)
}

/// All crontabs on the host, or an empty-shaped default on total failure.
pub async fn cron_get() -> Json<cron::CrontabSnapshot> {
    let snapshot = attempt("cron", cron::collect()).await.unwrap_or_default();
    Json(snapshot)
}

#[derive(Debug, Deserialize, Default)]
struct CronUpdateBody {
    user: Option<String>,
    content: Option<String>,
}

/// Replace a user's crontab wholesale.
pub async fn cron_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let body: CronUpdateBody = if body.is_empty() {
        CronUpdateBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) => return bad_request("Invalid JSON body"),
        }
    };

    let (user, content) = match (body.user.as_deref(), body.content) {
        (Some(user), Some(content)) if !user.is_empty() => (user.to_string(), content),
        _ => return bad_request("user and content are required"),
    };

    match state.installer.install(&user, &content).await {
        Ok(()) => {
            info!("replaced crontab for user {}", user);
            Json(json!({"success": true})).into_response()
        }
        Err(err) => {
            error!("crontab install for {} failed: {}", user, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response()
        }
    }
}

/// Current Wi-Fi link status; every field nullable.
pub async fn wifi_get() -> Json<wifi::WifiStatus> {
    Json(wifi::collect().await)
}

#[derive(Debug, Deserialize, Default)]
struct WifiChangeBody {
    ssid: Option<String>,
    password: Option<String>,
}

/// Change the Wi-Fi network credentials.
pub async fn wifi_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let body: WifiChangeBody = if body.is_empty() {
        WifiChangeBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) => return bad_request("Invalid JSON body"),
        }
    };

    let (ssid, password) = match (body.ssid, body.password) {
        (Some(ssid), Some(password)) if !ssid.is_empty() && !password.is_empty() => {
            (ssid, password)
        }
        _ => return bad_request("ssid and password are required"),
    };

    match wifi::change_network(&ssid, &password).await {
        Ok(()) => {
            info!("switched Wi-Fi network to {}", ssid);
            Json(json!({"success": true, "ssid": ssid})).into_response()
        }
        Err(err) => {
            error!("Wi-Fi change failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": err.to_string()})),
            )
                .into_response()
        }
    }
}

/// Fire-and-forget reboot. The contract is "acknowledged", not "confirmed":
/// the 200 goes out first, and a failure to even launch the command is
/// swallowed.
pub async fn reboot(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    info!("reboot requested");
    tokio::spawn(async {
        // Let the response flush before the host goes down.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = tokio::process::Command::new("sudo")
            .arg("reboot")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
    });

    Json(json!({"message": "Rebooting..."})).into_response()
}

/// Service advertisement for console auto-discovery.
pub async fn discover(State(state): State<AppState>) -> Json<serde_json::Value> {
    let facts = attempt("system", system::collect()).await.unwrap_or_default();
    Json(json!({
        "service": SERVICE_NAME,
        "version": AGENT_VERSION,
        "hostname": System::host_name().unwrap_or_else(|| "unknown".to_string()),
        "ip_address": network::default_ip(),
        "port": state.config.port,
        "model": facts.model,
        "os": facts.os_name,
        "architecture": facts.architecture,
        "timestamp": collectors::now_iso(),
    }))
}

/// Unmatched route.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not Found"}))).into_response()
}
