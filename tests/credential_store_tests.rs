//! Credential store tests against a local mock token endpoint

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Form, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use personal_mcp_adapters::auth::{
    AuthorizationSession, ConsentFlow, CredentialStore, OAuthClient, OAuthKeys,
};
use personal_mcp_adapters::error::{ErrorKind, Result};

/// Counts token endpoint hits across all routes
#[derive(Clone, Default)]
struct TokenEndpoint {
    calls: Arc<AtomicUsize>,
}

async fn refresh_ok(
    State(endpoint): State<TokenEndpoint>,
    Form(params): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    endpoint.calls.fetch_add(1, Ordering::SeqCst);
    if params.get("grant_type").map(String::as_str) != Some("refresh_token") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": "fresh-access",
            "expires_in": 3600,
            "token_type": "Bearer"
        })),
    )
}

async fn refresh_revoked(State(endpoint): State<TokenEndpoint>) -> (StatusCode, Json<Value>) {
    endpoint.calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "invalid_grant", "error_description": "Token has been expired or revoked."})),
    )
}

async fn refresh_down(State(endpoint): State<TokenEndpoint>) -> StatusCode {
    endpoint.calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE
}

/// Start the mock endpoint and return its base URL
async fn spawn_token_endpoint(endpoint: TokenEndpoint) -> String {
    let app = Router::new()
        .route("/token", post(refresh_ok))
        .route("/revoked", post(refresh_revoked))
        .route("/down", post(refresh_down))
        .with_state(endpoint);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn oauth_client(token_uri: String) -> OAuthClient {
    OAuthClient::new(
        OAuthKeys {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            auth_uri: "http://127.0.0.1:9/auth".to_string(),
            token_uri,
        },
        reqwest::Client::new(),
    )
}

fn session(expires_in_secs: i64, refresh_token: Option<&str>) -> AuthorizationSession {
    AuthorizationSession {
        access_token: "stored-access".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expiry: Some(Utc::now() + chrono::Duration::seconds(expires_in_secs)),
        scopes: vec!["https://www.googleapis.com/auth/drive".to_string()],
        token_type: "Bearer".to_string(),
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    path: PathBuf,
    endpoint: TokenEndpoint,
    base_url: String,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let endpoint = TokenEndpoint::default();
        let base_url = spawn_token_endpoint(endpoint.clone()).await;
        Self {
            _dir: dir,
            path,
            endpoint,
            base_url,
        }
    }

    fn store(&self, route: &str) -> CredentialStore {
        CredentialStore::new(
            self.path.clone(),
            oauth_client(format!("{}{}", self.base_url, route)),
            Duration::from_secs(60),
        )
    }

    fn calls(&self) -> usize {
        self.endpoint.calls.load(Ordering::SeqCst)
    }

    fn on_disk(&self) -> AuthorizationSession {
        serde_json::from_str(&std::fs::read_to_string(&self.path).unwrap()).unwrap()
    }
}

#[tokio::test]
async fn test_persist_then_load_round_trip() {
    let fx = Fixture::new().await;
    let store = fx.store("/token");
    let original = session(3600, Some("refresh-1"));

    store.persist(&original).await.unwrap();

    let loaded = fx.store("/token").load().await.unwrap();
    assert_eq!(loaded, Some(original));
}

#[tokio::test]
async fn test_valid_session_needs_no_refresh() {
    let fx = Fixture::new().await;
    let store = fx.store("/token");
    store.persist(&session(3600, Some("refresh-1"))).await.unwrap();

    let current = store.get_session().await.unwrap();

    assert_eq!(current.access_token, "stored-access");
    assert_eq!(fx.calls(), 0);
}

#[tokio::test]
async fn test_expired_session_refreshes_exactly_once() {
    let fx = Fixture::new().await;
    let store = fx.store("/token");
    store.persist(&session(-60, Some("refresh-1"))).await.unwrap();

    let refreshed = store.get_session().await.unwrap();
    assert_eq!(refreshed.access_token, "fresh-access");
    assert_eq!(fx.calls(), 1);

    let persisted = fx.on_disk();
    assert_eq!(persisted.access_token, "fresh-access");
    assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(
        persisted.scopes,
        vec!["https://www.googleapis.com/auth/drive".to_string()]
    );
    assert!(persisted.expiry.unwrap() > Utc::now());

    store.get_session().await.unwrap();
    assert_eq!(fx.calls(), 1);
}

#[tokio::test]
async fn test_session_refreshed_by_another_process_is_reused() {
    let fx = Fixture::new().await;
    let store = fx.store("/token");
    store.persist(&session(-60, Some("refresh-1"))).await.unwrap();
    store.load().await.unwrap();

    // a second adapter for the same account refreshes first
    fx.store("/token")
        .persist(&session(3600, Some("refresh-1")))
        .await
        .unwrap();

    let current = store.get_session().await.unwrap();
    assert_eq!(current.access_token, "stored-access");
    assert_eq!(fx.calls(), 0);
}

#[tokio::test]
async fn test_revoked_refresh_token_is_auth_expired() {
    let fx = Fixture::new().await;
    let store = fx.store("/revoked");
    let stale = session(-60, Some("revoked-refresh"));
    store.persist(&stale).await.unwrap();

    let err = store.get_session().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthExpiredError);
    assert!(err.to_string().contains("invalid_grant"));
    assert_eq!(fx.calls(), 1);
    assert_eq!(fx.on_disk(), stale);
}

#[tokio::test]
async fn test_token_endpoint_outage_is_unavailable() {
    let fx = Fixture::new().await;
    let store = fx.store("/down");
    store.persist(&session(-60, Some("refresh-1"))).await.unwrap();

    let err = store.get_session().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderUnavailableError);
}

#[tokio::test]
async fn test_missing_session_without_consent_is_auth_expired() {
    let fx = Fixture::new().await;
    let store = fx.store("/token");

    assert_eq!(store.load().await.unwrap(), None);
    let err = store.get_session().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthExpiredError);
    assert_eq!(fx.calls(), 0);
}

#[tokio::test]
async fn test_corrupt_file_is_reported_not_replaced() {
    let fx = Fixture::new().await;
    std::fs::write(&fx.path, "{ this is not json").unwrap();
    let store = fx.store("/token");

    let err = store.load().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialFileCorruptError);

    let err = store.get_session().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialFileCorruptError);
    assert_eq!(fx.calls(), 0);
    assert_eq!(
        std::fs::read_to_string(&fx.path).unwrap(),
        "{ this is not json"
    );
}

/// Consent double handing out a fixed session
struct ScriptedConsent {
    runs: AtomicUsize,
}

#[async_trait]
impl ConsentFlow for ScriptedConsent {
    async fn run(&self) -> Result<AuthorizationSession> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(AuthorizationSession {
            access_token: "consented-access".to_string(),
            ..session(3600, Some("consented-refresh"))
        })
    }
}

#[tokio::test]
async fn test_first_use_runs_consent_and_persists() {
    let fx = Fixture::new().await;
    let consent = Arc::new(ScriptedConsent {
        runs: AtomicUsize::new(0),
    });
    let store = fx.store("/token").with_consent(consent.clone());

    let first = store.get_session().await.unwrap();
    assert_eq!(first.access_token, "consented-access");
    assert_eq!(fx.on_disk().refresh_token.as_deref(), Some("consented-refresh"));

    store.get_session().await.unwrap();
    assert_eq!(consent.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_clear_removes_session() {
    let fx = Fixture::new().await;
    let store = fx.store("/token");
    store.persist(&session(3600, None)).await.unwrap();

    store.clear().await.unwrap();

    assert!(!fx.path.exists());
    assert_eq!(store.load().await.unwrap(), None);
    store.clear().await.unwrap();
}
