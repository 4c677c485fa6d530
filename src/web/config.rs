//! Agent configuration.
//!
//! Loaded once at startup from the environment, optionally overridden by
//! CLI flags, then immutable. The router and auth gate receive it by value;
//! nothing reads ambient environment state at request time.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Immutable agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Shared secret for mutating endpoints; empty disables the auth check
    pub token: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_PORT,
            token: String::new(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `PIWATCH_HOST`, `PIWATCH_PORT`, and
    /// `PIWATCH_TOKEN`. An unparseable port is a startup error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("PIWATCH_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PIWATCH_PORT") {
            config.port = port
                .parse()
                .map_err(|_| AgentError::config_error(format!("invalid PIWATCH_PORT: {}", port)))?;
        }
        if let Ok(token) = std::env::var("PIWATCH_TOKEN") {
            config.token = token;
        }

        Ok(config)
    }

    /// Set the host to bind to.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port to bind to.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the shared secret.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Whether the auth gate is active.
    pub fn auth_enabled(&self) -> bool {
        !self.token.is_empty()
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_open_on_the_standard_port() {
        let config = AgentConfig::default();
        assert_eq!(config.port, crate::DEFAULT_PORT);
        assert_eq!(config.host, "0.0.0.0");
        assert!(!config.auth_enabled());
    }

    #[test]
    fn builder_overrides() {
        let config = AgentConfig::default()
            .with_host("127.0.0.1")
            .with_port(9200)
            .with_token("secret");
        assert_eq!(config.bind_address(), "127.0.0.1:9200");
        assert!(config.auth_enabled());
    }
}
