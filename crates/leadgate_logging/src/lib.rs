//! Shared logging utilities for LeadGate binaries.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "leadgate=info,leadgate_engine=info,leadgate_store=info";

/// Logging configuration shared by LeadGate binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Initialize tracing with env-filtered stderr output.
///
/// `RUST_LOG` overrides the default filter; `verbose` drops the floor to
/// debug for the workspace crates.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let filter = if config.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("leadgate=debug,leadgate_engine=debug,leadgate_store=debug")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(filter),
        )
        .init();

    tracing::debug!(app = config.app_name, "logging initialized");
    Ok(())
}
