use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// sliderd — alert slider and touchscreen gesture daemon
#[derive(Parser)]
#[command(name = "sliderd", version, about)]
struct Cli {
    /// Path to the config file (TOML).
    #[arg(short, long, default_value = "/etc/sliderd/config.toml")]
    config: PathBuf,

    /// Enable JSON log output (for journald).
    #[arg(long)]
    json: bool,

    /// Validate config and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Init tracing.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sliderd=info"));

    if cli.json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    info!("sliderd v{}", env!("CARGO_PKG_VERSION"));

    // Load config.
    let config_path = cli
        .config
        .canonicalize()
        .unwrap_or_else(|_| cli.config.clone());
    let config = sliderd::config::load(&config_path)?;

    if cli.check {
        println!(
            "config OK: {} hooks, settings at {}",
            config.hooks.len(),
            config.sliderd.settings_path.display(),
        );
        return Ok(());
    }

    info!(
        "loaded config: {} hooks, user {}",
        config.hooks.len(),
        config.sliderd.user
    );

    // Run the daemon.
    sliderd::daemon::run(config).await?;

    Ok(())
}
