use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lineprof::cli::Cli;
use lineprof::demo::{self, DemoOptions};
use lineprof::{ProfilerConfig, Session};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the config file if given, then apply CLI overrides
fn load_config(args: &Cli) -> Result<ProfilerConfig> {
    let mut config = match &args.config {
        Some(path) => ProfilerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ProfilerConfig::default(),
    };
    if let Some(color) = args.color {
        config.color = color;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let session = Session::with_config(&config);
    let options = DemoOptions {
        sleep: Duration::from_millis(args.sleep_ms),
        iterations: args.iterations,
    };

    let outcome = demo::run_scenario(&session, args.scenario, &options);

    // Export even when the scenario failed; the report was already printed
    if let Some(path) = &args.json {
        if let Some(snapshot) = session.last_report() {
            snapshot
                .write_json(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    outcome
}
