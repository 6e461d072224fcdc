//! Interactive browser consent
//!
//! Opens the provider's authorization page and waits for the loopback
//! redirect carrying the authorization code.

use std::collections::HashMap;
use std::future::IntoFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Query, response::Html, routing::get, Router};
use tokio::sync::oneshot;

use crate::auth::oauth::OAuthClient;
use crate::auth::session::AuthorizationSession;
use crate::error::{AdapterError, AuthError, Result};

/// Operator-driven flow producing a brand new session
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn run(&self) -> Result<AuthorizationSession>;
}

/// Consent through the system browser and a loopback HTTP callback
pub struct BrowserConsent {
    oauth: OAuthClient,
    scopes: Vec<String>,
    port: u16,
    timeout: Duration,
}

impl BrowserConsent {
    pub fn new(oauth: OAuthClient, scopes: Vec<String>, port: u16, timeout: Duration) -> Self {
        Self {
            oauth,
            scopes,
            port,
            timeout,
        }
    }
}

type CodeSender = Arc<Mutex<Option<oneshot::Sender<std::result::Result<String, String>>>>>;

/// Router answering the provider's redirect. The first `code` (or `error`)
/// received is forwarded to `tx`; later hits only get a page.
pub fn callback_router(tx: oneshot::Sender<std::result::Result<String, String>>) -> Router {
    let tx: CodeSender = Arc::new(Mutex::new(Some(tx)));

    let callback_handler = move |Query(params): Query<HashMap<String, String>>| {
        let tx = tx.clone();
        async move {
            let outcome = match (params.get("code"), params.get("error")) {
                (Some(code), _) => Ok(code.clone()),
                (None, Some(error)) => Err(error.clone()),
                (None, None) => Err("no authorization code received".to_string()),
            };
            let page = match &outcome {
                Ok(_) => Html("<html><body><h1>Authorization successful!</h1><p>You can close this window.</p></body></html>"),
                Err(_) => Html("<html><body><h1>Authorization failed</h1><p>No authorization code received.</p></body></html>"),
            };

            if let Ok(mut slot) = tx.lock() {
                if let Some(tx) = slot.take() {
                    let _ = tx.send(outcome);
                }
            }
            page
        }
    };

    Router::new().route("/", get(callback_handler))
}

#[async_trait]
impl ConsentFlow for BrowserConsent {
    async fn run(&self) -> Result<AuthorizationSession> {
        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}/", port);

        let auth_url = self.oauth.authorization_url(&redirect_uri, &self.scopes);
        eprintln!("\nPlease visit this URL to authorize access:");
        eprintln!("{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        let (tx, rx) = oneshot::channel();
        let server = axum::serve(listener, callback_router(tx)).into_future();

        tracing::info!(port, "Waiting for authorization callback");

        let code = tokio::select! {
            result = server => {
                let message = match result {
                    Ok(()) => "callback server stopped".to_string(),
                    Err(e) => e.to_string(),
                };
                return Err(AdapterError::Auth(AuthError::CallbackError { message }));
            }
            received = tokio::time::timeout(self.timeout, rx) => match received {
                Ok(Ok(Ok(code))) => code,
                Ok(Ok(Err(message))) => {
                    return Err(AdapterError::Auth(AuthError::CallbackError { message }));
                }
                Ok(Err(_)) => return Err(AdapterError::Auth(AuthError::NoAuthCode)),
                Err(_) => {
                    return Err(AdapterError::Auth(AuthError::ConsentTimedOut {
                        secs: self.timeout.as_secs(),
                    }));
                }
            },
        };

        tracing::info!("Received authorization code, exchanging for tokens");
        self.oauth.exchange_code(&code, &redirect_uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_callback_forwards_code() {
        let (tx, rx) = oneshot::channel();
        let app = callback_router(tx);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/?code=4%2Fabc&scope=x")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(rx.await.unwrap(), Ok("4/abc".to_string()));
    }

    #[tokio::test]
    async fn test_callback_forwards_denial() {
        let (tx, rx) = oneshot::channel();
        let app = callback_router(tx);

        app.oneshot(
            Request::builder()
                .uri("/?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(rx.await.unwrap(), Err("access_denied".to_string()));
    }
}
