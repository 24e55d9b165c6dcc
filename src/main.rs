use std::future::ready;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use console::{style, Term};
use payoutd::auth::{BasicAuth, WebhookAuth};
use payoutd::config::Config;
use payoutd::metrics::{api_metrics, init_prometheus_metrics};
use payoutd::observability::{init_logging, LoggingConfig};
use payoutd::router::build_router;
use payoutd::state::AppState;
use tracing::info;

#[derive(Parser)]
#[clap(version, about = "Payout request lifecycle daemon")]
struct Cli {
    /// Data directory path (contains config and the ledger file)
    #[clap(long, env = "PAYOUTD_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Password (overrides config)
    #[clap(long, env = "PAYOUTD_PASSWORD")]
    password: Option<String>,

    /// Server address (overrides config)
    #[clap(long, env = "PAYOUTD_ADDR")]
    addr: Option<String>,

    /// Webhook signing secret (overrides config)
    #[clap(long, env = "PAYOUTD_WEBHOOK_SECRET")]
    webhook_secret: Option<String>,

    /// Disable authentication
    #[clap(long)]
    no_auth: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli: Cli = Cli::parse();

    // Initialize structured logging
    let log_config = LoggingConfig {
        level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        log_dir: cli.data_dir.join("logs"),
        console_output: std::env::var("NO_CONSOLE_LOG").is_err(),
        file_output: std::env::var("NO_FILE_LOG").is_err(),
        ..Default::default()
    };
    init_logging(log_config)?;

    tracing::info!("Starting payoutd with structured logging and observability");

    // Ensure data directory exists
    std::fs::create_dir_all(&cli.data_dir)?;

    // Config file is always in data_dir
    let config_path = cli.data_dir.join("payoutd.conf");

    // Load or create configuration file with automatic password generation
    let term = Term::stdout();
    let (mut config, password_generated) = Config::load_or_create(&config_path)?;

    if password_generated {
        term.write_line(&format!(
            "{}{}",
            style("Generating default api password...").yellow(),
            style("done").white()
        ))?;
    }

    // Override config with CLI arguments
    config.data_dir = Some(cli.data_dir.clone());
    if let Some(password) = cli.password {
        config.http_password = Some(password);
    }
    if let Some(addr) = cli.addr {
        if let Some((ip, port_str)) = addr.split_once(':') {
            config.http_bind_ip = ip.to_string();
            if let Ok(port) = port_str.parse::<u16>() {
                config.http_bind_port = port;
            }
        }
    }
    if let Some(webhook_secret) = cli.webhook_secret {
        config.webhook_secret = Some(webhook_secret);
    }
    if cli.no_auth {
        config.http_password = None;
    }

    let state = AppState::new(cli.data_dir.clone()).await?;

    start_main_server(&config, state).await?;
    Ok(())
}

async fn start_main_server(config: &Config, state: AppState) -> Result<()> {
    let basic_auth = Arc::new(BasicAuth::new(config.http_password.clone()));
    let webhook_auth = Arc::new(WebhookAuth::new(config.webhook_secret.clone()));

    let auth_status = if config.is_auth_enabled() {
        "enabled"
    } else {
        "disabled"
    };
    let webhook_status = if webhook_auth.is_enabled() {
        "enabled"
    } else {
        "disabled"
    };
    info!(
        "Starting server with authentication {auth_status} and webhook signature verification \
         {webhook_status}"
    );

    let metrics_handle = init_prometheus_metrics()?;

    let app = build_router(state, basic_auth, webhook_auth)
        .route("/metrics", get(move || ready(metrics_handle.render())))
        .route_layer(middleware::from_fn(track_metrics));

    let addr = config.http_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("payoutd listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn track_metrics(req: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status_code = response.status().as_u16();

    api_metrics::record_api_request(&method.to_string(), &path, status_code, duration);

    response
}
