//! Seam between the dispatch loop and an adapter's tools

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::mcp::registry::ToolRegistry;

/// An adapter's tool set
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Tools this handler serves
    fn registry(&self) -> &ToolRegistry;

    /// Execute `tool` with arguments that already passed registry validation
    async fn call(&self, tool: &str, args: Value) -> Result<Value>;
}
