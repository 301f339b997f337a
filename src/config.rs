//! Configuration management for the MCP tool server
//!
//! Handles defaults and environment variable overrides.

use std::str::FromStr;

use crate::error::{ConfigError, McpServerError, Result};
use crate::mcp::types::{LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};

/// Default server name reported by `initialize`
pub const DEFAULT_SERVER_NAME: &str = "mcp-tool-server";

/// How a failed `tools/call` is reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ToolErrorPolicy {
    /// JSON-RPC error `-32602` with a descriptive message
    #[default]
    #[value(name = "protocol")]
    ProtocolError,

    /// Successful response carrying `isError: true`
    #[value(name = "result")]
    ErrorResult,
}

impl FromStr for ToolErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "protocol" => Ok(ToolErrorPolicy::ProtocolError),
            "result" => Ok(ToolErrorPolicy::ErrorResult),
            other => Err(ConfigError::InvalidValue {
                var: "tool error policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration for the MCP tool server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name reported in `serverInfo`
    pub server_name: String,

    /// Version reported in `serverInfo`
    pub server_version: String,

    /// Protocol version offered when the client's is unsupported
    pub protocol_version: String,

    /// Reporting convention for tool failures
    pub tool_error_policy: ToolErrorPolicy,
}

impl Config {
    /// Create a configuration from defaults and `MCP_*` environment variables
    pub fn new() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            if name.trim().is_empty() {
                return Err(McpServerError::Config(ConfigError::InvalidValue {
                    var: "MCP_SERVER_NAME".to_string(),
                    value: name,
                }));
            }
            config.server_name = name;
        }

        if let Ok(version) = std::env::var("MCP_PROTOCOL_VERSION") {
            config.protocol_version = version;
        }

        if let Ok(policy) = std::env::var("MCP_TOOL_ERRORS") {
            config.tool_error_policy = policy.parse().map_err(|_| ConfigError::InvalidValue {
                var: "MCP_TOOL_ERRORS".to_string(),
                value: policy.clone(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configured protocol version is one we can speak
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&self.protocol_version.as_str()) {
            return Err(McpServerError::Config(ConfigError::InvalidConfig {
                message: format!("unsupported protocol version: {}", self.protocol_version),
            }));
        }
        Ok(())
    }

    pub fn with_tool_error_policy(mut self, policy: ToolErrorPolicy) -> Self {
        self.tool_error_policy = policy;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            tool_error_policy: ToolErrorPolicy::default(),
        }
    }
}
