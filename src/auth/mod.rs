//! Authorization for the OAuth-backed adapters
//!
//! Handles:
//! - Loading OAuth client secrets
//! - Persisting and refreshing the per-account session
//! - Interactive browser-based consent

pub mod consent;
pub mod oauth;
pub mod session;
pub mod store;

pub use consent::{BrowserConsent, ConsentFlow};
pub use oauth::{OAuthClient, OAuthKeys};
pub use session::AuthorizationSession;
pub use store::CredentialStore;
