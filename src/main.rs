// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use physisense_node::{
    api::{start_server, AppState},
    NodeConfig, ReasoningClient, InstrumentDetector,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🧪 Starting PhysiSense Node...\n");

    let config = NodeConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Load the detection model. There is no fallback model: failure here
    // aborts startup before any request is served.
    println!("📦 Loading detection model: {}", config.model_path);
    let detector = InstrumentDetector::load(&config.model_path)
        .with_context(|| format!("Failed to load detection model from {}", config.model_path))?;
    println!("✅ Detection model loaded");

    println!("🤖 Configuring reasoning client...");
    let reasoning = ReasoningClient::new(config.reasoning.clone())
        .context("Failed to configure reasoning client")?;
    println!("✅ Reasoning client ready");

    let state = AppState::new(Arc::new(detector), Arc::new(reasoning));

    let separator = "=".repeat(60);
    println!("\n{}", separator);
    println!("🎉 PhysiSense Node is running!");
    println!("{}", separator);
    println!("Page:           http://localhost:{}/", config.api_port);
    println!("Health:         http://localhost:{}/health", config.api_port);
    println!("Upload:         POST http://localhost:{}/v1/upload", config.api_port);
    println!("Detect:         POST http://localhost:{}/v1/detect", config.api_port);
    println!("Reset:          POST http://localhost:{}/v1/reset", config.api_port);
    println!("\nPress Ctrl+C to shutdown...");
    println!("{}\n", separator);

    start_server(config.api_port, state).await?;

    println!("👋 Goodbye!");
    Ok(())
}
