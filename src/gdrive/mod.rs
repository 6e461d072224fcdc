//! Google Drive adapter
//!
//! Files, comments and spreadsheet values, all under one Drive session.

pub mod client;
pub mod tools;
pub mod types;

pub use client::{DriveApi, DriveClient};
pub use tools::DriveTools;
