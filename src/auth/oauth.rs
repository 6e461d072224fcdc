//! OAuth 2.0 client credentials and token endpoint calls

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;

use crate::auth::session::AuthorizationSession;
use crate::error::{AdapterError, AuthError, ProviderError, Result};

/// OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Auth URI
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    /// Token URI
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth client secrets file format (can be "installed" or "web")
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    installed: Option<OAuthKeys>,
    web: Option<OAuthKeys>,
}

impl OAuthKeys {
    /// Load client credentials from a Google Cloud Console secrets file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AdapterError::Auth(AuthError::KeysFileNotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let keys_file: OAuthKeysFile =
            serde_json::from_str(&content).map_err(|_| AuthError::InvalidKeysFormat)?;

        keys_file
            .installed
            .or(keys_file.web)
            .ok_or_else(|| AdapterError::Auth(AuthError::InvalidKeysFormat))
    }
}

/// Token response from OAuth token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error body returned by the token endpoint
#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Thin client for the provider's authorization and token endpoints
#[derive(Clone)]
pub struct OAuthClient {
    keys: OAuthKeys,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(keys: OAuthKeys, http_client: reqwest::Client) -> Self {
        Self { keys, http_client }
    }

    /// Generate the authorization URL for the consent page
    pub fn authorization_url(&self, redirect_uri: &str, scopes: &[String]) -> String {
        let scopes = scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.keys.auth_uri,
            urlencoding::encode(&self.keys.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes)
        )
    }

    /// Exchange an authorization code for a new session
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationSession> {
        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::Auth(AuthError::TokenExchangeFailed {
                message: describe_token_error(&text),
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(AuthorizationSession::from_token_response(
            token_response,
            None,
            Utc::now(),
        ))
    }

    /// Mint a new access token from the session's refresh token.
    ///
    /// A refusal from the endpoint (expired or revoked refresh token) is an
    /// `AuthError::Expired`: only a new consent can recover from it.
    pub async fn refresh(&self, session: &AuthorizationSession) -> Result<AuthorizationSession> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AdapterError::auth_expired("no refresh token available"))?;

        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AdapterError::Provider(ProviderError::Unavailable {
                message: format!("token endpoint returned {}", status),
            }));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::auth_expired(format!(
                "token refresh refused: {}",
                describe_token_error(&text)
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(AuthorizationSession::from_token_response(
            token_response,
            Some(session),
            Utc::now(),
        ))
    }
}

fn describe_token_error(body: &str) -> String {
    let parsed: TokenErrorBody = serde_json::from_str(body).unwrap_or_default();
    match (parsed.error.is_empty(), parsed.error_description) {
        (false, Some(description)) => format!("{} ({})", parsed.error, description),
        (false, None) => parsed.error,
        (true, _) if body.trim().is_empty() => "empty response".to_string(),
        (true, _) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_keys_deserialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{
                "installed": {
                    "client_id": "test-client-id",
                    "client_secret": "test-secret",
                    "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                    "token_uri": "https://oauth2.googleapis.com/token",
                    "redirect_uris": ["http://localhost"]
                }
            }"#,
        )
        .unwrap();

        let keys = OAuthKeys::load(&path).unwrap();
        assert_eq!(keys.client_id, "test-client-id");
    }

    #[test]
    fn test_web_keys_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"web":{"client_id":"w","client_secret":"s"}}"#).unwrap();
        let keys = OAuthKeys::load(&path).unwrap();
        assert_eq!(keys.client_id, "w");
        assert_eq!(keys.token_uri, "https://oauth2.googleapis.com/token");

        let missing = OAuthKeys::load(&dir.path().join("nope.json"));
        assert!(matches!(
            missing,
            Err(AdapterError::Auth(AuthError::KeysFileNotFound { .. }))
        ));
    }

    #[test]
    fn test_authorization_url_is_encoded() {
        let keys = OAuthKeys {
            client_id: "id 1".into(),
            client_secret: "s".into(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
        };
        let client = OAuthClient::new(keys, reqwest::Client::new());
        let url = client.authorization_url("http://localhost:8080/", &["a b".to_string()]);
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?client_id=id%201"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2F"));
        assert!(url.contains("access_type=offline"));
    }

    #[test]
    fn test_describe_token_error() {
        assert_eq!(
            describe_token_error(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#),
            "invalid_grant (Token has been expired or revoked.)"
        );
        assert_eq!(describe_token_error(""), "empty response");
        assert_eq!(describe_token_error("boom"), "boom");
    }
}
