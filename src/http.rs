//! Authenticated HTTP access to Google APIs
//!
//! Every request carries the bearer token from the [`CredentialStore`]; every
//! non-success status is mapped onto the adapter error taxonomy here, so the
//! provider clients only deal with typed results.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::CredentialStore;
use crate::error::{AdapterError, AuthError, ProviderError, Result};

/// HTTP client bound to one account's credential store
pub struct ApiClient {
    http_client: reqwest::Client,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    pub fn new(store: Arc<CredentialStore>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client, store })
    }

    /// GET a JSON resource
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T> {
        let request = self.http_client.get(url).query(query);
        let response = self.execute(request, resource).await?;
        read_json(response).await
    }

    /// Send a JSON body and decode a JSON reply
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: &B,
        resource: &str,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .http_client
            .request(method, url)
            .query(query)
            .json(body);
        let response = self.execute(request, resource).await?;
        read_json(response).await
    }

    /// Send a pre-encoded body (multipart uploads) and decode a JSON reply
    pub async fn send_raw<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        content_type: &str,
        body: Vec<u8>,
        resource: &str,
    ) -> Result<T> {
        let request = self
            .http_client
            .request(method, url)
            .query(query)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        let response = self.execute(request, resource).await?;
        read_json(response).await
    }

    /// POST without a body, decoding a JSON reply
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T> {
        let request = self
            .http_client
            .post(url)
            .query(query)
            .header(reqwest::header::CONTENT_LENGTH, "0");
        let response = self.execute(request, resource).await?;
        read_json(response).await
    }

    /// GET raw bytes (file downloads and exports)
    pub async fn get_bytes(
        &self,
        url: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<Vec<u8>> {
        let request = self.http_client.get(url).query(query);
        let response = self.execute(request, resource).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// DELETE a resource
    pub async fn delete(&self, url: &str, resource: &str) -> Result<()> {
        let request = self.http_client.delete(url);
        self.execute(request, resource).await?;
        Ok(())
    }

    async fn execute(&self, request: RequestBuilder, resource: &str) -> Result<Response> {
        let token = self.store.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        tracing::debug!(%status, resource, "Provider request failed");
        Err(error_for_status(status, retry_after.as_deref(), &body, resource))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let text = response.text().await?;
    let body = if text.trim().is_empty() { "{}" } else { &text };
    serde_json::from_str(body).map_err(|e| AdapterError::unexpected_response(e.to_string()))
}

/// Google JSON error envelope
#[derive(Debug, Default, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    error: GoogleError,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    reason: String,
}

const RATE_LIMIT_REASONS: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "quotaExceeded",
    "dailyLimitExceeded",
];

/// Map a failed provider response onto the error taxonomy
pub fn error_for_status(
    status: StatusCode,
    retry_after: Option<&str>,
    body: &str,
    resource: &str,
) -> AdapterError {
    let parsed: GoogleErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.error.message.is_empty() {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            status.to_string()
        } else {
            trimmed.chars().take(500).collect()
        }
    } else {
        parsed.error.message.clone()
    };
    let rate_limited_reason = parsed
        .error
        .errors
        .iter()
        .any(|e| RATE_LIMIT_REASONS.contains(&e.reason.as_str()));

    match status {
        StatusCode::UNAUTHORIZED => AdapterError::Auth(AuthError::Rejected { message }),
        StatusCode::NOT_FOUND => AdapterError::not_found(resource),
        StatusCode::TOO_MANY_REQUESTS => AdapterError::Provider(ProviderError::RateLimited {
            message,
            retry_after_secs: retry_after.and_then(|v| v.trim().parse().ok()),
        }),
        StatusCode::FORBIDDEN if rate_limited_reason => {
            AdapterError::Provider(ProviderError::RateLimited {
                message,
                retry_after_secs: retry_after.and_then(|v| v.trim().parse().ok()),
            })
        }
        s if s.is_server_error() => AdapterError::Provider(ProviderError::Unavailable {
            message: format!("{} ({})", message, s),
        }),
        s => AdapterError::Provider(ProviderError::Rejected {
            status: s.as_u16(),
            message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_unauthorized_is_auth_rejected() {
        let err = error_for_status(
            StatusCode::UNAUTHORIZED,
            None,
            r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#,
            "message abc",
        );
        assert_eq!(err.kind(), ErrorKind::AuthRejectedError);
        assert!(err.to_string().contains("Invalid Credentials"));
    }

    #[test]
    fn test_not_found_names_resource() {
        let err = error_for_status(StatusCode::NOT_FOUND, None, "", "event e1");
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
        assert!(err.to_string().contains("event e1"));
    }

    #[test]
    fn test_rate_limits_carry_retry_hint() {
        let err = error_for_status(StatusCode::TOO_MANY_REQUESTS, Some("17"), "", "files");
        assert_eq!(err.kind(), ErrorKind::RateLimitedError);
        assert_eq!(err.retry_after_secs(), Some(17));

        let err = error_for_status(
            StatusCode::FORBIDDEN,
            None,
            r#"{"error":{"message":"User Rate Limit Exceeded","errors":[{"reason":"userRateLimitExceeded"}]}}"#,
            "files",
        );
        assert_eq!(err.kind(), ErrorKind::RateLimitedError);
        assert_eq!(err.retry_after_secs(), None);
    }

    #[test]
    fn test_other_statuses() {
        let err = error_for_status(
            StatusCode::FORBIDDEN,
            None,
            r#"{"error":{"message":"Insufficient Permission","errors":[{"reason":"insufficientPermissions"}]}}"#,
            "files",
        );
        assert_eq!(err.kind(), ErrorKind::ProviderRejectedError);

        let err = error_for_status(StatusCode::BAD_REQUEST, None, "Invalid To header", "send");
        assert_eq!(err.kind(), ErrorKind::ProviderRejectedError);
        assert!(err.to_string().contains("Invalid To header"));

        let err = error_for_status(StatusCode::BAD_GATEWAY, None, "", "send");
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailableError);
    }
}
