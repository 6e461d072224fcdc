//! Apple Notes MCP server

use std::process::ExitCode;

use personal_mcp_adapters::{cli, Adapter};

#[tokio::main]
async fn main() -> ExitCode {
    cli::run(Adapter::Notes).await
}
