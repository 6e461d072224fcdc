//! Google Calendar adapter

pub mod client;
pub mod tools;
pub mod types;

pub use client::{CalendarApi, CalendarClient};
pub use tools::CalendarTools;
