//! Error handling for the PiWatch agent.
//!
//! Three error families with strictly different fates:
//!
//! - [`AgentError`]: startup and server faults. The only errors allowed to
//!   halt the process, and only before it begins serving.
//! - [`CollectError`]: any failure inside a source adapter. Always absorbed
//!   by the aggregator into an absent field, never surfaced over HTTP.
//! - [`MutationError`]: failures of state-changing operations. Surfaced as
//!   500 responses with the underlying tool's error text.

/// A specialized `Result` type for agent startup and server operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Top-level error type for process startup and the web server.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl AgentError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }
}

/// Failure of a single source adapter.
///
/// Every lower-level fault (missing binary, permission denial, subprocess
/// timeout, malformed output) is converted to this type inside the adapter.
/// Nothing beyond the adapter boundary ever sees the raw cause.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output from a tool or pseudo-file could not be parsed
    #[error("failed to parse {0}")]
    Parse(String),

    /// External tool exited with a nonzero status
    #[error("{tool} failed: {detail}")]
    Command { tool: String, detail: String },

    /// External tool exceeded its timeout
    #[error("{tool} timed out")]
    Timeout { tool: String },

    /// The metric source does not exist on this host
    #[error("{0}")]
    Unavailable(String),
}

impl CollectError {
    /// Create a new parse error
    pub fn parse(what: impl Into<String>) -> Self {
        Self::Parse(what.into())
    }

    /// Create a new command-failure error
    pub fn command(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Command {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(tool: impl Into<String>) -> Self {
        Self::Timeout { tool: tool.into() }
    }

    /// Create a new source-unavailable error
    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable(what.into())
    }
}

/// Failure of a state-changing operation (crontab install, Wi-Fi change).
///
/// The `Display` text of these variants goes verbatim into the `error`
/// field of a 500 response body.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// The external tool is not installed
    #[error("{0} command not found")]
    MissingTool(String),

    /// The external tool exceeded its timeout
    #[error("{0} command timed out")]
    Timeout(String),

    /// The operation ran but failed; carries the tool's error text
    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_error_messages_match_wire_contract() {
        assert_eq!(
            MutationError::MissingTool("crontab".into()).to_string(),
            "crontab command not found"
        );
        assert_eq!(
            MutationError::Timeout("crontab".into()).to_string(),
            "crontab command timed out"
        );
        assert_eq!(
            MutationError::Failed("no crontab for bob".into()).to_string(),
            "no crontab for bob"
        );
    }

    #[test]
    fn collect_error_constructors() {
        let err = CollectError::command("docker", "daemon not running");
        assert!(err.to_string().contains("docker"));
        assert!(err.to_string().contains("daemon not running"));

        let err = CollectError::timeout("vcgencmd");
        assert_eq!(err.to_string(), "vcgencmd timed out");
    }
}
