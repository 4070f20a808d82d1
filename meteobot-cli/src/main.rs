//! Binary crate for the `meteobot` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Wiring config, cache, providers and geocoder into one request

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

/// `--log-level` wins over `RUST_LOG`; anything unparsable falls back to info.
fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_tracing(level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; credentials may live in the config file.
    dotenvy::dotenv().ok();

    let cmd = cli::Cli::parse();
    init_tracing(cmd.log_level.as_deref());
    cmd.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_flag_sets_the_filter() {
        assert_eq!(env_filter(Some("debug")).to_string(), "debug");
        assert_eq!(env_filter(Some("meteobot_core=trace")).to_string(), "meteobot_core=trace");
    }

    #[test]
    fn invalid_log_level_falls_back_to_info() {
        assert_eq!(env_filter(Some("meteobot_core=loud")).to_string(), "info");
    }
}
