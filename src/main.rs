// SPDX-License-Identifier: MIT

use clap::Parser;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use doorsim::config::SimConfig;
use doorsim::transport::control;

#[tokio::main]
async fn main() {
    let config = SimConfig::parse();
    let (log_tx, log_layer) = control::log_channel();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).with(log_layer).init();

    if let Err(e) = doorsim::run(config, log_tx).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
