use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use sessiongate::config::{ApiConfig, ConfigError};
use sessiongate::net::api::HttpAuthApi;
use sessiongate::net::error::TransportError;
use sessiongate::router::location::{REDIRECT_QUERY_KEY, post_login_destination};
use sessiongate::router::routes::{RouteName, RouteTable};
use sessiongate::router::{NavigationError, Router};
use sessiongate::state::session::{SessionError, SessionStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Navigation(#[from] NavigationError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sessiongate", about = "Cookie-session auth client with guarded navigation")]
struct Cli {
    /// API base URL; overrides `SESSIONGATE_API_URL`.
    #[arg(long)]
    api_url: Option<String>,

    /// Origin for a relative API URL; overrides `SESSIONGATE_ORIGIN`.
    #[arg(long)]
    origin: Option<String>,

    /// Automatic retries on transient failure; overrides `SESSIONGATE_RETRY`.
    #[arg(long)]
    retry: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the session and print the current user.
    Me,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SESSIONGATE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Guarded navigation to run after a successful login.
        #[arg(long)]
        navigate: Option<String>,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SESSIONGATE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        navigate: Option<String>,
    },
    Logout,
    /// Print where a guarded navigation to PATH lands.
    Navigate { path: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::debug!(base_url = %config.base_url, retry = config.retry, "api config");

    let api = HttpAuthApi::new(&config)?;
    let store = Arc::new(SessionStore::new(Arc::new(api)));
    let router = Router::new(store.clone(), RouteTable::default());

    match cli.command {
        Command::Me => run_me(&store).await,
        Command::Login { email, password, navigate } => {
            let payload = store.login(&email, &password).await?;
            print_json(&serde_json::to_value(payload)?)?;
            run_post_auth_navigation(&router, navigate).await
        }
        Command::Register { email, password, name, navigate } => {
            let payload = store.register(&email, &password, &name).await?;
            print_json(&serde_json::to_value(payload)?)?;
            run_post_auth_navigation(&router, navigate).await
        }
        Command::Logout => {
            store.logout().await;
            println!("logged out");
            Ok(())
        }
        Command::Navigate { path } => {
            let settled = router.push(&path).await?;
            println!("{settled}");
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment config with command-line flags taking precedence.
fn load_config(cli: &Cli) -> Result<ApiConfig, CliError> {
    let overrides = [
        ("SESSIONGATE_API_URL", cli.api_url.clone()),
        ("SESSIONGATE_ORIGIN", cli.origin.clone()),
        ("SESSIONGATE_RETRY", cli.retry.map(|n| n.to_string())),
    ];
    let config = ApiConfig::from_lookup(|key| {
        overrides
            .iter()
            .find(|(name, _)| *name == key)
            .and_then(|(_, value)| value.clone())
            .or_else(|| std::env::var(key).ok())
    })?;
    Ok(config)
}

async fn run_me(store: &SessionStore) -> Result<(), CliError> {
    store.initialize().await;
    match store.user() {
        Some(user) => print_json(&serde_json::to_value(user)?),
        None => {
            println!("not authenticated");
            Ok(())
        }
    }
}

/// Guarded navigation after login/register. Off-site targets fall back to the dashboard.
async fn run_post_auth_navigation(router: &Router, navigate: Option<String>) -> Result<(), CliError> {
    let Some(target) = navigate else {
        return Ok(());
    };
    let from = router
        .guard()
        .routes()
        .location_for(RouteName::Login)
        .with_query(REDIRECT_QUERY_KEY, target);
    let destination = post_login_destination(&from, RouteName::Dashboard.default_path());
    let settled = router.push(&destination).await?;
    println!("{settled}");
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
