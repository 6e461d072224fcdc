//! Apple Notes adapter
//!
//! Drives the local Notes application through AppleScript. There is no OAuth
//! session; the macOS Automation permission takes its place.

pub mod client;
pub mod script;
pub mod tools;
pub mod types;

pub use client::{NotesApi, NotesClient};
pub use script::{Osascript, ScriptRunner};
pub use tools::NotesTools;
