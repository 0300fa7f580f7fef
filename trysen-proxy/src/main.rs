#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trysen_proxy_lib::config::load_from_path;
use trysen_proxy_lib::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(author, version, about = "Admission-controlling reverse proxy for issue collectors")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", env = "TRYSEN_CONFIG", default_value = "trysen.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            init_fallback_tracing();
            error!(%err, path = %cli.config.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cfg.logging) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    info!(
        listen = %cfg.listen,
        backend = %cfg.backend.origin,
        tls = cfg.tls.is_some(),
        ceiling = cfg.admission.ceiling,
        base_limit = cfg.admission.base_limit,
        "configuration loaded"
    );

    if let Err(err) = trysen_proxy_lib::run(Arc::new(cfg)).await {
        error!(%err, "proxy exited with error");
        std::process::exit(1);
    }
}

// Used only until the configured logging section is available
fn init_fallback_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
