//! Configuration management for the adapters
//!
//! Handles paths, environment variables, and per-adapter defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AdapterError, ConfigError, Result};

/// The provider an adapter process fronts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Gmail,
    Calendar,
    Drive,
    Notes,
}

impl Adapter {
    /// Server name advertised during `initialize`
    pub fn server_name(&self) -> &'static str {
        match self {
            Adapter::Gmail => "gmail-mcp",
            Adapter::Calendar => "gcal-mcp",
            Adapter::Drive => "gdrive-mcp",
            Adapter::Notes => "apple-notes-mcp",
        }
    }

    /// Executable name, used in operator hints
    pub fn binary_name(&self) -> &'static str {
        match self {
            Adapter::Gmail => "gmail-mcp-server",
            Adapter::Calendar => "gcal-mcp-server",
            Adapter::Drive => "gdrive-mcp-server",
            Adapter::Notes => "apple-notes-mcp-server",
        }
    }

    /// Prefix for this adapter's environment variables
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Adapter::Gmail => "GMAIL_MCP",
            Adapter::Calendar => "GCAL_MCP",
            Adapter::Drive => "GDRIVE_MCP",
            Adapter::Notes => "NOTES_MCP",
        }
    }

    /// Whether the adapter needs an OAuth session
    pub fn uses_oauth(&self) -> bool {
        !matches!(self, Adapter::Notes)
    }

    /// OAuth scopes requested at consent time
    pub fn scopes(&self) -> Vec<String> {
        let scopes: &[&str] = match self {
            Adapter::Gmail => &[
                "https://www.googleapis.com/auth/gmail.readonly",
                "https://www.googleapis.com/auth/gmail.send",
                "https://www.googleapis.com/auth/gmail.modify",
            ],
            Adapter::Calendar => &[
                "https://www.googleapis.com/auth/calendar",
                "https://www.googleapis.com/auth/calendar.events",
            ],
            Adapter::Drive => &[
                "https://www.googleapis.com/auth/drive",
                "https://www.googleapis.com/auth/drive.file",
                "https://www.googleapis.com/auth/drive.metadata.readonly",
                "https://www.googleapis.com/auth/spreadsheets.readonly",
            ],
            Adapter::Notes => &[],
        };
        scopes.iter().map(|s| s.to_string()).collect()
    }

    fn default_dir_name(&self) -> &'static str {
        self.server_name()
    }
}

/// Configuration for one adapter process
#[derive(Debug, Clone)]
pub struct Config {
    /// Which adapter this process runs
    pub adapter: Adapter,

    /// Named account (Gmail only); `None` is the primary account
    pub account: Option<String>,

    /// Directory for storing configuration files
    pub config_dir: PathBuf,

    /// Path to OAuth client secrets
    pub client_secrets_path: PathBuf,

    /// Path to the persisted authorization session
    pub token_path: PathBuf,

    /// OAuth loopback callback port (0 picks a free port)
    pub oauth_callback_port: u16,

    /// OAuth scopes
    pub scopes: Vec<String>,

    /// Per-request timeout for provider calls
    pub http_timeout: Duration,

    /// How long to wait for the operator to finish browser consent
    pub consent_timeout: Duration,

    /// Allow running browser consent when serving without a stored session
    pub interactive: bool,

    /// Sessions expiring within this margin are refreshed early
    pub refresh_margin: Duration,

    /// Calendar events default time zone
    pub default_timezone: String,
}

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONSENT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_REFRESH_MARGIN_SECS: u64 = 300;
const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

impl Config {
    /// Build the configuration from the environment, creating the config
    /// directory if needed
    pub fn from_env(adapter: Adapter, account: Option<String>) -> Result<Self> {
        let prefix = adapter.env_prefix();

        let config_dir = match env_var(prefix, "CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => Self::default_config_dir(adapter)?,
        };
        ensure_dir(&config_dir)?;

        let mut config = Self::in_dir(adapter, account, config_dir);

        if let Some(path) = env_var(prefix, "CLIENT_SECRETS_PATH") {
            config.client_secrets_path = PathBuf::from(path);
        }
        if let Some(path) = env_var(prefix, "TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }
        if let Some(port) = parse_env_var::<u16>(prefix, "OAUTH_PORT")? {
            config.oauth_callback_port = port;
        }
        if let Some(secs) = parse_env_var::<u64>(prefix, "HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env_var::<u64>(prefix, "CONSENT_TIMEOUT_SECS")? {
            config.consent_timeout = Duration::from_secs(secs);
        }
        if let Some(interactive) = parse_env_var::<bool>(prefix, "INTERACTIVE")? {
            config.interactive = interactive;
        }
        if let Some(tz) = env_var(prefix, "DEFAULT_TIMEZONE") {
            config.default_timezone = tz;
        }

        Ok(config)
    }

    /// Configuration rooted at an explicit directory, with default file names
    pub fn in_dir(adapter: Adapter, account: Option<String>, config_dir: PathBuf) -> Self {
        let token_file = token_file_name(account.as_deref());
        Self {
            adapter,
            client_secrets_path: config_dir.join("credentials.json"),
            token_path: config_dir.join(token_file),
            account,
            config_dir,
            oauth_callback_port: 0,
            scopes: adapter.scopes(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            consent_timeout: Duration::from_secs(DEFAULT_CONSENT_TIMEOUT_SECS),
            interactive: false,
            refresh_margin: Duration::from_secs(DEFAULT_REFRESH_MARGIN_SECS),
            default_timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }

    /// `~/.config/<adapter>-mcp`
    fn default_config_dir(adapter: Adapter) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            AdapterError::Config(ConfigError::DirNotFound {
                path: "~".to_string(),
            })
        })?;
        Ok(home.join(".config").join(adapter.default_dir_name()))
    }

    /// Check if the OAuth client secrets file exists
    pub fn client_secrets_exist(&self) -> bool {
        self.client_secrets_path.exists()
    }

    /// Display name of the active account
    pub fn account_name(&self) -> &str {
        self.account.as_deref().unwrap_or("primary")
    }
}

/// Token file for a named account
pub fn token_file_name(account: Option<&str>) -> String {
    match account {
        None | Some("primary") => "token.json".to_string(),
        Some("secondary") => "token_secondary.json".to_string(),
        Some(name) => format!("token_{}.json", name),
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|_| {
            AdapterError::Config(ConfigError::DirCreationFailed {
                path: dir.display().to_string(),
            })
        })?;
    }
    Ok(())
}

fn env_var(prefix: &str, name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", prefix, name))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn parse_env_var<T: std::str::FromStr>(prefix: &str, name: &str) -> Result<Option<T>> {
    match env_var(prefix, name) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| {
            AdapterError::Config(ConfigError::InvalidEnvVar {
                var: format!("{}_{}", prefix, name),
                value,
            })
        }),
    }
}

/// Google API endpoints
pub mod google {
    pub const GMAIL_API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
    pub const CALENDAR_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
    pub const DRIVE_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
    pub const DRIVE_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";
    pub const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";

    /// Gmail system label IDs
    pub mod labels {
        pub const INBOX: &str = "INBOX";
        pub const UNREAD: &str = "UNREAD";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_defaults() {
        let config = Config::in_dir(Adapter::Calendar, None, PathBuf::from("/tmp/gcal"));
        assert_eq!(config.token_path, PathBuf::from("/tmp/gcal/token.json"));
        assert_eq!(
            config.client_secrets_path,
            PathBuf::from("/tmp/gcal/credentials.json")
        );
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(!config.interactive);
        assert_eq!(config.default_timezone, "America/Los_Angeles");
    }

    #[test]
    fn test_default_scopes() {
        let config = Config::in_dir(Adapter::Gmail, None, PathBuf::from("/tmp/gmail"));
        assert_eq!(config.scopes.len(), 3);
        assert!(config.scopes[2].contains("gmail.modify"));
        assert!(Adapter::Notes.scopes().is_empty());
    }

    #[test]
    fn test_account_token_files() {
        assert_eq!(token_file_name(None), "token.json");
        assert_eq!(token_file_name(Some("primary")), "token.json");
        assert_eq!(token_file_name(Some("secondary")), "token_secondary.json");
        assert_eq!(token_file_name(Some("work")), "token_work.json");

        let config = Config::in_dir(
            Adapter::Gmail,
            Some("work".into()),
            PathBuf::from("/tmp/gmail"),
        );
        assert_eq!(config.account_name(), "work");
        assert_eq!(config.token_path, PathBuf::from("/tmp/gmail/token_work.json"));
    }
}
