//! Authorization session model
//!
//! The persisted form is JSON. Field aliases let the store read token files
//! written by Google's `google-auth` Python library (`token`, `expiry`).

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::oauth::TokenResponse;

/// Access tokens without an `expires_in` are assumed to live this long
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// A renewable credential bundle for one external account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSession {
    /// Bearer token presented on every provider call
    #[serde(alias = "token")]
    pub access_token: String,

    /// Secret used to mint new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token expiry; unknown expiry counts as expired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,

    /// Granted scopes
    #[serde(default, deserialize_with = "deserialize_scopes")]
    pub scopes: Vec<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Scopes arrive either as a JSON list or as the space-separated string the
/// token endpoint returns
fn deserialize_scopes<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scopes {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Scopes>::deserialize(deserializer)? {
        Some(Scopes::List(list)) => list,
        Some(Scopes::Joined(joined)) => split_scopes(&joined),
        None => Vec::new(),
    })
}

fn split_scopes(joined: &str) -> Vec<String> {
    joined.split_whitespace().map(str::to_string).collect()
}

impl AuthorizationSession {
    /// Build a session from a fresh token endpoint response. Fields the
    /// endpoint leaves out (refresh token, scopes) carry over from `previous`.
    pub fn from_token_response(
        response: TokenResponse,
        previous: Option<&AuthorizationSession>,
        now: DateTime<Utc>,
    ) -> Self {
        let lifetime = response.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let scopes = match response.scope.as_deref().map(split_scopes) {
            Some(scopes) if !scopes.is_empty() => scopes,
            _ => previous.map(|p| p.scopes.clone()).unwrap_or_default(),
        };

        Self {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            expiry: Some(now + Duration::seconds(lifetime)),
            scopes,
            token_type: response.token_type.unwrap_or_else(default_token_type),
        }
    }

    /// True while the access token outlives `now + margin`
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        !self.access_token.is_empty()
            && self.expiry.map(|expiry| expiry > now + margin).unwrap_or(false)
    }

    /// True when a non-empty refresh token is available
    pub fn is_refreshable(&self) -> bool {
        self.refresh_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }
}

impl fmt::Debug for AuthorizationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationSession")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .field("token_type", &self.token_type)
            .finish()
    }
}
