#![cfg(not(tarpaulin_include))]

use clap::Parser;
use fleet_dashboard::app;
use fleet_dashboard::config::Config;

/// Main entry point for the fleet dashboard web application
///
/// Reads configuration from the command line and environment, sets up
/// logging (`RUST_LOG`, default `info`) and serves until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    app::run(config).await
}
