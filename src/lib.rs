//! Personal MCP adapters
//!
//! Model Context Protocol servers exposing Gmail, Google Calendar, Google
//! Drive and Apple Notes as tools. Each adapter binary owns one authorization
//! session and serves one client over stdio.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gcal;
pub mod gdrive;
pub mod gmail;
pub mod http;
pub mod mcp;
pub mod notes;

pub use config::{Adapter, Config};
pub use error::{AdapterError, ErrorKind, Result};
