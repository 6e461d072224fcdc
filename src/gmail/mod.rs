//! Gmail adapter
//!
//! Provides:
//! - Typed Gmail API access behind the [`GmailApi`] seam
//! - Message composition for send, reply and forward
//! - The `gmail_*` tool set

pub mod client;
pub mod mime;
pub mod tools;
pub mod types;

pub use client::{GmailApi, GmailClient};
pub use tools::{AccountDirectory, GmailTools};
