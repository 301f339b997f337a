//! Built-in tools
//!
//! Small tools shipped with the binary, mostly useful for trying out a
//! client against the server.

pub mod greet;
pub mod register_user;

pub use greet::Greet;
pub use register_user::RegisterUser;

use crate::error::Result;
use crate::mcp::server::McpServer;

/// Register every built-in tool on `server`
pub fn register_builtin_tools(server: &mut McpServer) -> Result<()> {
    server.register_tool(Greet)?;
    server.register_tool(RegisterUser::new())?;
    Ok(())
}
