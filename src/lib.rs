//! MCP Tool Server Library
//!
//! The request-handling core of a Model Context Protocol (MCP) server:
//! a JSON-RPC dispatcher, a tool registry with declarative argument
//! schemas, and `_meta` field handling.

pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;

pub use config::{Config, ToolErrorPolicy};
pub use error::{McpServerError, Result};
pub use mcp::server::McpServer;
