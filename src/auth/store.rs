//! Persisted authorization session for one account
//!
//! The credential file is the only state shared between processes (two
//! adapters for the same account). Reads tolerate concurrent writers because
//! every write goes to a temporary file in the same directory and is renamed
//! over the target.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::auth::consent::ConsentFlow;
use crate::auth::oauth::{OAuthClient, OAuthKeys};
use crate::auth::session::AuthorizationSession;
use crate::config::Config;
use crate::error::{AdapterError, AuthError, Result};

/// Owner of one account's authorization session
pub struct CredentialStore {
    path: PathBuf,
    oauth: OAuthClient,
    refresh_margin: chrono::Duration,
    consent: Option<Arc<dyn ConsentFlow>>,
    session: Mutex<Option<AuthorizationSession>>,
}

impl CredentialStore {
    /// Create a store for the configured token path, loading the OAuth client
    /// secrets it needs for refreshes
    pub fn open(config: &Config) -> Result<Self> {
        let keys = OAuthKeys::load(&config.client_secrets_path)?;
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self::new(
            config.token_path.clone(),
            OAuthClient::new(keys, http_client),
            config.refresh_margin,
        ))
    }

    pub fn new(path: PathBuf, oauth: OAuthClient, refresh_margin: std::time::Duration) -> Self {
        Self {
            path,
            oauth,
            refresh_margin: chrono::Duration::from_std(refresh_margin)
                .unwrap_or_else(|_| chrono::Duration::zero()),
            consent: None,
            session: Mutex::new(None),
        }
    }

    /// Enable interactive consent when no usable session exists
    pub fn with_consent(mut self, consent: Arc<dyn ConsentFlow>) -> Self {
        self.consent = Some(consent);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Read the persisted session without touching the network.
    ///
    /// Returns `Ok(None)` when no credential file exists and
    /// `CredentialFileCorrupt` when it cannot be parsed.
    pub async fn load(&self) -> Result<Option<AuthorizationSession>> {
        let loaded = self.read_file().await?;
        *self.session.lock().await = loaded.clone();
        Ok(loaded)
    }

    /// Return a usable session, refreshing or running consent as needed
    pub async fn get_session(&self) -> Result<AuthorizationSession> {
        let mut cached = self.session.lock().await;
        let now = Utc::now();

        if let Some(session) = cached.as_ref() {
            if session.is_valid_at(now, self.refresh_margin) {
                return Ok(session.clone());
            }
        }

        // Another process may have refreshed the file since we cached it.
        let current = match self.read_file().await? {
            Some(on_disk) => Some(on_disk),
            None => cached.take(),
        };

        if let Some(session) = current.as_ref() {
            if session.is_valid_at(now, self.refresh_margin) {
                *cached = current.clone();
                return Ok(session.clone());
            }
        }

        let outcome = match current {
            Some(session) if session.is_refreshable() => {
                tracing::info!(path = %self.path.display(), "Access token expired, refreshing");
                self.oauth.refresh(&session).await
            }
            Some(_) => Err(AdapterError::auth_expired(
                "stored session has expired and holds no refresh token",
            )),
            None => Err(AdapterError::auth_expired(format!(
                "no stored session at {}",
                self.path.display()
            ))),
        };

        let session = match outcome {
            Ok(session) => session,
            Err(AdapterError::Auth(AuthError::Expired { message })) => match &self.consent {
                Some(consent) => {
                    tracing::warn!("{}; starting interactive consent", message);
                    consent.run().await?
                }
                None => return Err(AdapterError::Auth(AuthError::Expired { message })),
            },
            Err(e) => return Err(e),
        };

        self.persist(&session).await?;
        *cached = Some(session.clone());
        Ok(session)
    }

    /// Current bearer token
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.get_session().await?.access_token)
    }

    /// Run the consent flow unconditionally and persist the result
    pub async fn reconsent(&self, consent: &dyn ConsentFlow) -> Result<AuthorizationSession> {
        let mut cached = self.session.lock().await;
        let session = consent.run().await?;
        self.persist(&session).await?;
        *cached = Some(session.clone());
        Ok(session)
    }

    /// Replace the credential file with `session`
    pub async fn persist(&self, session: &AuthorizationSession) -> Result<()> {
        let contents = serde_json::to_vec_pretty(session)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &contents))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        tracing::debug!(path = %self.path.display(), "Persisted authorization session");
        Ok(())
    }

    /// Remove the credential file
    pub async fn clear(&self) -> Result<()> {
        let mut cached = self.session.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *cached = None;
        Ok(())
    }

    async fn read_file(&self) -> Result<Option<AuthorizationSession>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            AdapterError::Auth(AuthError::CredentialFileCorrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })
        })
    }
}

/// Write `contents` to a sibling temporary file, flush it and rename it over
/// `path`. The temporary file is created with owner-only permissions.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".token-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomically_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        write_atomically(&path, b"a much longer first version of the file").unwrap();
        write_atomically(&path, b"short").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_credential_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        write_atomically(&path, b"{}").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }
}
