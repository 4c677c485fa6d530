//! # PiWatch - Single-Host Telemetry Agent
//!
//! A small Rust agent that samples point-in-time operational facts from the
//! local machine (resource usage, scheduled jobs, network identity) and
//! exposes them over an authenticated HTTP interface for a remote monitoring
//! console.
//!
//! ## Design
//!
//! - **Source adapters** (`collectors::*`): one per metric domain, each a
//!   zero-argument sample that either returns a structured value or fails
//!   with a [`CollectError`].
//! - **Fault isolation**: [`collectors::attempt`] wraps every adapter call;
//!   a broken sensor degrades one field of the snapshot, never the response.
//! - **Crontab engine** (`cron`): parses per-user and system-wide crontabs
//!   into structured job records and can replace a user's crontab wholesale.
//! - **Auth gate** (`web`): mutating endpoints require the `X-Auth-Token`
//!   header to match the configured shared secret; reads are open.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use piwatch::{start_server, AgentConfig};
//!
//! #[tokio::main]
//! async fn main() -> piwatch::Result<()> {
//!     let config = AgentConfig::from_env()?;
//!     start_server(config).await
//! }
//! ```

pub mod collectors;
pub mod cron;
pub mod error;
pub mod web;

// Re-export public API
pub use collectors::MetricsSnapshot;
pub use cron::{CronJob, CrontabSnapshot};
pub use error::{AgentError, CollectError, MutationError, Result};
pub use web::{start_server, AgentConfig};

/// The default HTTP port the agent listens on
pub const DEFAULT_PORT: u16 = 9100;

/// Agent version reported by /health and /discover
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service identity advertised by /discover
pub const SERVICE_NAME: &str = "piwatch-agent";
