//! MCP (Model Context Protocol) server implementation
//!
//! Exposes the ICAET knowledge base over stdio for Cursor and other IDE clients.

mod prompts;
mod server;
mod tools;
mod types;

pub use server::{McpServer, PROTOCOL_VERSION, SERVER_NAME};
pub use tools::{get_tool_definitions, handle_tool_call, QUERY_TOOL};
pub use types::{McpError, McpRequest, McpResponse, ToolResult};
