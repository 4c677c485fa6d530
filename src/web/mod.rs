//! HTTP surface of the agent.
//!
//! Read endpoints are open; mutating endpoints (crontab replace, Wi-Fi
//! change, reboot) pass through the shared-secret auth gate first.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::AgentConfig;
pub use router::{create_app, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::ServiceExt;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::info;

use crate::cron::SystemCrontabInstaller;
use crate::error::{AgentError, Result};

/// Start the agent's HTTP server and serve until the process is stopped.
pub async fn start_server(config: AgentConfig) -> Result<()> {
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| AgentError::config_error(format!("Invalid bind address: {}", e)))?;

    let state = AppState {
        config: Arc::new(config),
        installer: Arc::new(SystemCrontabInstaller),
    };

    let app = create_app(state);
    // Routing ignores trailing slashes, so normalization has to wrap the
    // router rather than sit inside it.
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    info!("PiWatch agent v{} listening on http://{}", crate::AGENT_VERSION, addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AgentError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .await
        .map_err(|e| AgentError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
