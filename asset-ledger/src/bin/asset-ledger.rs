//! Asset ledger command-line node
//!
//! ```text
//! asset-ledger <Function> [args...]
//! asset-ledger CreateProduct p1 kiwi NA 1/9/24 9
//! asset-ledger ReadAsset p1
//! ```

use anyhow::{bail, Context};
use asset_ledger::{config::LogFormat, AssetLedger, Config, Invocation};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("ASSET_LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?
            .with_env_overrides()?,
        Err(_) => Config::from_env()?,
    };

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    match config.log.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    let mut argv = std::env::args().skip(1);
    let Some(function) = argv.next() else {
        bail!("usage: asset-ledger <Function> [args...]");
    };
    let args: Vec<String> = argv.collect();
    let invocation = Invocation::parse(&function, &args)?;

    let ledger = AssetLedger::open(config).context("opening ledger")?;
    tracing::info!(function = invocation.name(), "Invoking");

    let result = invocation.execute(&ledger)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    tracing::debug!(metrics = %ledger.metrics().gather_text(), "Final metrics");
    ledger.close()?;
    Ok(())
}
