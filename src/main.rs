//! pagespeed-proxy
//!
//! ```text
//!     Client Request ──▶ SetRequestId ─▶ Trace ─▶ lazy_load ─▶ origin handler ──▶ Origin
//!                                                    │          (request deadline)
//!     Client Response ◀── rewritten HTML (or untouched) ◀───────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use pagespeed_proxy::config::{self, loader, PageSpeedConfig};
use pagespeed_proxy::lifecycle::{signals, Shutdown};
use pagespeed_proxy::observability::{logging, metrics};
use pagespeed_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "pagespeed-proxy")]
#[command(about = "Rewrites proxied HTML pages for lazy-loaded, WebP-capable images", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used without one.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<PageSpeedConfig, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => {
            let mut config = PageSpeedConfig::default();
            loader::apply_env_overrides(&mut config, std::env::var(loader::CRAWLER_BOTS_ENV).ok());
            config
        }
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pagespeed-proxy starting");

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let rx = shutdown.subscribe();
    tokio::spawn(signals::shutdown_on_signal(shutdown));

    server.run(listener, rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
