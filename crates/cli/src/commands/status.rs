//! `stemchat status`: show configuration status.

use std::path::Path;

use super::{config_file, load_config};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let file = config_file(config_path);

    println!("StemChat Status");
    println!("===============");
    println!("  Config file:   {}", file.display());
    println!("  Organization:  {}", config.organization_name);
    println!("  LLM:           {}", if config.has_api_key() { "enabled" } else { "disabled (no API key)" });
    println!("  Provider:      {}", config.provider);
    println!("  Model:         {}", config.model);
    println!("  Temperature:   {}", config.temperature);
    println!("  Max tokens:    {}", config.max_tokens);
    println!("  LLM timeout:   {}s", config.llm.timeout_secs);
    println!(
        "  Database:      {}",
        config.knowledge.database_url.as_deref().unwrap_or("none (static facts only)")
    );
    println!(
        "  Fact sheet:    {}",
        config.knowledge.facts_path.as_deref().unwrap_or("built-in")
    );
    println!("  Knowledge TTL: {} min", config.knowledge.ttl_minutes);
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);

    if file.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, run `stemchat init` first");
    }

    Ok(())
}
