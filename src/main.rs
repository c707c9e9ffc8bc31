//! Ask Em All
//!
//! Web backend that sends one conversation to many LLMs at once and
//! returns every answer keyed by model id.

use anyhow::Result;
use ask_em_all::{
    config::{Environment, Settings},
    server::App,
};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Ask Em All
///
/// Query many LLMs in parallel through an OpenRouter-compatible API.
#[derive(Parser, Debug)]
#[command(name = "ask-em-all")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT env var)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST env var)
    #[arg(long)]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Environment: dev, staging, prod (overrides ENVIRONMENT env var)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Upstream aggregator base URL (overrides UPSTREAM_BASE_URL env var)
    #[arg(long)]
    upstream_url: Option<String>,

    /// Maximum parallel upstream calls per chat request (overrides FANOUT_MAX_CONCURRENCY)
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Overall deadline for one chat request in seconds (overrides FANOUT_DEADLINE_SECS)
    #[arg(long)]
    deadline_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;

    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }
    if let Some(url) = args.upstream_url {
        settings.upstream.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(max) = args.max_concurrency {
        settings.fanout.max_concurrency = max;
    }
    if let Some(secs) = args.deadline_secs {
        settings.fanout.deadline_seconds = Some(secs);
    }

    init_tracing(&settings.log_level, settings.environment);

    // Validated once, after CLI overrides and with tracing installed
    settings.validate()?;

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        host = %settings.host,
        port = %settings.port,
        upstream = %settings.upstream.base_url,
        "Starting application"
    );

    let app = App::new(settings)?;
    app.run_with_graceful_shutdown().await?;

    tracing::info!("Application shutdown complete");

    Ok(())
}

/// Initialize the tracing subscriber
///
/// JSON lines outside development, human readable text in development.
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str, environment: Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = if environment == Environment::Development {
        fmt::layer().with_target(false).with_filter(filter).boxed()
    } else {
        fmt::layer().json().with_filter(filter).boxed()
    };

    tracing_subscriber::registry().with(console_layer).init();
}
