//! MCP (Model Context Protocol) module
//!
//! Implements the MCP server protocol for tool invocation.

pub mod handler;
pub mod registry;
pub mod server;
pub mod types;

pub use handler::ToolHandler;
pub use registry::{page_size, parse_args, FieldType, ToolDescriptor, ToolRegistry};
pub use server::McpServer;
