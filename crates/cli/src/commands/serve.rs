//! `stemchat serve`: start the HTTP gateway.

use std::path::Path;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("StemChat Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   LLM:       {}", if config.has_api_key() { "on" } else { "off" });

    stemchat_gateway::start(config).await?;

    Ok(())
}
