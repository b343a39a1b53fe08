//! `rallysync init --endpoint <url> [--source ...] [--delay-ms ...] [--no-provision-all]`

use anyhow::{Context, Result};
use clap::Args;

use rallysync_core::{config, SyncConfig};

use super::home;

/// Write the sync configuration.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Remote endpoint every request is POSTed to.
    #[arg(long)]
    pub endpoint: String,

    /// Value sent as `metadata.source`.
    #[arg(long, default_value = "sheet")]
    pub source: String,

    /// Pause after each create or delete call, in milliseconds.
    #[arg(long = "delay-ms", default_value_t = 500)]
    pub delay_ms: u64,

    /// Request timeout in seconds.
    #[arg(long = "timeout-secs", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Only provision records that changed, even on a first sync.
    #[arg(long)]
    pub no_provision_all: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let config = SyncConfig {
            endpoint: self.endpoint.trim().to_string(),
            source: self.source,
            call_delay_ms: self.delay_ms,
            timeout_secs: self.timeout_secs,
            provision_all_on_empty_baseline: !self.no_provision_all,
        };

        config::save_at(&home, &config).context("failed to write config")?;

        println!("✓ Configured endpoint {}", config.endpoint);
        println!("  Saved to: {}", config::config_path_at(&home).display());
        Ok(())
    }
}
