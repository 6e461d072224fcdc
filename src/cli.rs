//! Process entry shared by the adapter binaries
//!
//! Parses the command line, sets up logging on stderr, performs the startup
//! checks and then either runs consent (`auth`) or serves MCP on stdio.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use crate::auth::{BrowserConsent, CredentialStore};
use crate::config::{Adapter, Config};
use crate::gcal::{CalendarClient, CalendarTools};
use crate::gdrive::{DriveClient, DriveTools};
use crate::gmail::{AccountDirectory, GmailClient, GmailTools};
use crate::http::ApiClient;
use crate::mcp::{McpServer, ToolHandler};
use crate::notes::{NotesClient, NotesTools, Osascript};

/// MCP server exposing one personal data source as tools
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Named account to use (stored as token_<name>.json)
    #[arg(long, global = true)]
    pub account: Option<String>,

    /// Open the browser for consent at startup when no session is stored
    #[arg(long)]
    pub interactive: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize access to the provider (run this first)
    Auth {
        /// Run consent even when a usable session is already stored
        #[arg(long)]
        force: bool,
    },
}

/// Log to stderr; stdout carries protocol frames only
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Run an adapter binary to completion
pub async fn run(adapter: Adapter) -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match execute(adapter, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(adapter: Adapter, cli: Cli) -> anyhow::Result<()> {
    let mut config =
        Config::from_env(adapter, cli.account).context("Failed to load configuration")?;
    if cli.interactive {
        config.interactive = true;
    }

    match cli.command {
        Some(Commands::Auth { force }) => authenticate(&config, force).await,
        None => serve(config).await,
    }
}

fn require_client_secrets(config: &Config) -> anyhow::Result<()> {
    if !config.client_secrets_exist() {
        bail!(
            "OAuth client secrets not found at {}. Download them from the Google Cloud \
             console or set {}_CLIENT_SECRETS_PATH.",
            config.client_secrets_path.display(),
            config.adapter.env_prefix()
        );
    }
    Ok(())
}

fn browser_consent(config: &Config, store: &CredentialStore) -> BrowserConsent {
    BrowserConsent::new(
        store.oauth().clone(),
        config.scopes.clone(),
        config.oauth_callback_port,
        config.consent_timeout,
    )
}

/// `auth` subcommand
async fn authenticate(config: &Config, force: bool) -> anyhow::Result<()> {
    if !config.adapter.uses_oauth() {
        bail!(
            "{} has no OAuth session. Allow automation of Notes under System Settings > \
             Privacy & Security > Automation instead.",
            config.adapter.binary_name()
        );
    }
    require_client_secrets(config)?;

    let store = CredentialStore::open(config).context("Failed to load OAuth client secrets")?;

    if !force {
        if let Ok(Some(_)) = store.load().await {
            match store.get_session().await {
                Ok(_) => {
                    eprintln!(
                        "Already authenticated as account '{}'. Use --force to re-authorize.",
                        config.account_name()
                    );
                    return Ok(());
                }
                Err(e) => tracing::info!(error = %e, "Stored session unusable, re-authorizing"),
            }
        }
    }

    let consent = browser_consent(config, &store);
    store
        .reconsent(&consent)
        .await
        .context("Authorization failed")?;

    eprintln!(
        "Authentication completed. Session saved to {}",
        store.path().display()
    );
    Ok(())
}

/// Startup checks for OAuth adapters: client secrets present and a parsable
/// session stored (or consent allowed)
async fn open_store(config: &Config) -> anyhow::Result<Arc<CredentialStore>> {
    require_client_secrets(config)?;

    let mut store =
        CredentialStore::open(config).context("Failed to load OAuth client secrets")?;
    if config.interactive {
        let consent = browser_consent(config, &store);
        store = store.with_consent(Arc::new(consent));
    }

    let stored = store.load().await.with_context(|| {
        format!(
            "Stored session is unreadable. Run `{} auth --force` to replace it.",
            config.adapter.binary_name()
        )
    })?;

    if stored.is_none() {
        if !config.interactive {
            bail!(
                "Not authenticated. Run `{} auth` first.",
                config.adapter.binary_name()
            );
        }
        store
            .get_session()
            .await
            .context("Interactive authorization failed")?;
    }

    Ok(Arc::new(store))
}

async fn google_api(config: &Config) -> anyhow::Result<Arc<ApiClient>> {
    let store = open_store(config).await?;
    let api = ApiClient::new(store, config.http_timeout).context("Failed to build HTTP client")?;
    Ok(Arc::new(api))
}

async fn build_handler(config: &Config) -> anyhow::Result<Arc<dyn ToolHandler>> {
    let handler: Arc<dyn ToolHandler> = match config.adapter {
        Adapter::Gmail => {
            let api = google_api(config).await?;
            let accounts =
                AccountDirectory::new(config.config_dir.clone(), config.account_name());
            Arc::new(GmailTools::new(Arc::new(GmailClient::new(api)), accounts))
        }
        Adapter::Calendar => {
            let api = google_api(config).await?;
            Arc::new(CalendarTools::new(
                Arc::new(CalendarClient::new(api)),
                config.default_timezone.clone(),
            ))
        }
        Adapter::Drive => {
            let api = google_api(config).await?;
            Arc::new(DriveTools::new(Arc::new(DriveClient::new(api))))
        }
        Adapter::Notes => {
            let runner = Arc::new(Osascript::new(config.http_timeout));
            Arc::new(NotesTools::new(Arc::new(NotesClient::new(runner))))
        }
    };
    Ok(handler)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let handler = build_handler(&config).await?;

    tracing::info!(
        server = config.adapter.server_name(),
        account = config.account_name(),
        "Starting MCP server on stdio"
    );
    McpServer::new(config.adapter.server_name(), handler)
        .run_stdio()
        .await
        .context("MCP server failed")?;

    tracing::info!("Client disconnected, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_auth_force_with_account() {
        let cli = Cli::parse_from(["gmail-mcp-server", "auth", "--force", "--account", "work"]);
        assert_eq!(cli.account.as_deref(), Some("work"));
        assert!(matches!(cli.command, Some(Commands::Auth { force: true })));
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["gcal-mcp-server"]);
        assert!(cli.command.is_none());
        assert!(!cli.interactive);
    }

    #[tokio::test]
    async fn test_notes_needs_no_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::in_dir(Adapter::Notes, None, dir.path().to_path_buf());
        let handler = build_handler(&config).await.unwrap();
        assert_eq!(handler.registry().descriptors().len(), 10);
    }

    #[tokio::test]
    async fn test_missing_session_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("credentials.json"),
            r#"{"installed":{"client_id":"id","client_secret":"secret"}}"#,
        )
        .unwrap();
        let config = Config::in_dir(Adapter::Drive, None, dir.path().to_path_buf());

        let err = build_handler(&config).await.err().unwrap();
        assert!(err.to_string().contains("gdrive-mcp-server auth"));
    }
}
