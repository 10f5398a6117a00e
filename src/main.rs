use anyhow::Result;
use bridge_auth::OAuthManager;
use bridge_cache::ThinkingCache;
use bridge_config::Config;
use bridge_proxy::AppState;
use bridge_store::{FileCredentialStore, UpstashStore};
use bridge_types::{CredentialStore, KvStore};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "claude-bridge",
    about = "claude-bridge — OpenAI-compatible gateway in front of Anthropic's Messages API"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server (default).
    Serve {
        /// Override the listening port (default: 9095 or $PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show authentication status.
    Status,
    /// Remove the stored credential.
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    init_tracing(config.debug_enabled());

    match cli.command {
        None | Some(Commands::Serve { port: None }) => cmd_serve(config, None).await,
        Some(Commands::Serve { port }) => cmd_serve(config, port).await,
        Some(Commands::Status) => cmd_status(config).await,
        Some(Commands::Logout) => cmd_logout(config).await,
    }
}

async fn cmd_serve(config: Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.port);
    let http = reqwest::Client::new();

    let (store, kv): (Arc<dyn CredentialStore>, Option<Arc<dyn KvStore>>) =
        match config.upstash() {
            Some((url, token)) => {
                tracing::info!("credential store: upstash; thinking cache: persistent");
                let upstash = Arc::new(UpstashStore::new(url, token, http.clone()));
                (upstash.clone(), Some(upstash))
            }
            None => {
                tracing::info!("credential store: local file; thinking cache: memory only");
                (Arc::new(FileCredentialStore::in_cwd()), None)
            }
        };

    let auth = Arc::new(OAuthManager::new(
        store,
        http.clone(),
        config.anthropic_oauth_client_id.clone(),
    ));
    let cache = Arc::new(ThinkingCache::new(kv, config.thinking_cache_ttl()));
    let state = AppState::new(config, auth, cache, http);
    let app = bridge_proxy::make_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("claude-bridge listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn cmd_status(config: Config) -> Result<()> {
    let auth = make_auth(&config);
    if auth.is_authenticated().await {
        println!("authenticated");
    } else {
        println!("not authenticated; start the server and open the login page");
    }
    Ok(())
}

async fn cmd_logout(config: Config) -> Result<()> {
    let auth = make_auth(&config);
    auth.logout()
        .await
        .map_err(|e| anyhow::anyhow!("logout failed: {e}"))?;
    println!("logged out");
    Ok(())
}

fn make_auth(config: &Config) -> OAuthManager {
    let http = reqwest::Client::new();
    let store: Arc<dyn CredentialStore> = match config.upstash() {
        Some((url, token)) => Arc::new(UpstashStore::new(url, token, http.clone())),
        None => Arc::new(FileCredentialStore::in_cwd()),
    };
    OAuthManager::new(store, http, config.anthropic_oauth_client_id.clone())
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
