//! `stemchat init`: write a default config file and fact sheet.

use std::path::Path;
use stemchat_config::AppConfig;
use stemchat_knowledge::StaticFacts;

use super::config_file;

pub async fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_file(config_path);
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_dir);
    let facts_path = config_dir.join("facts.toml");

    println!("StemChat Setup");
    println!("==============\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if facts_path.exists() && !force {
        println!("Fact sheet already exists at: {}", facts_path.display());
    } else {
        let facts = toml::to_string_pretty(&StaticFacts::default())?;
        std::fs::write(&facts_path, facts)?;
        println!("Created fact sheet at: {}", facts_path.display());
    }

    if config_path.exists() && !force {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    let mut config = AppConfig::default();
    config.knowledge.facts_path = Some(facts_path.display().to_string());
    std::fs::write(&config_path, toml::to_string_pretty(&config)?)?;
    println!("Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Add an API key to {} (or set STEMCHAT_API_KEY)", config_path.display());
    println!("   2. Point knowledge.database_url at the website database");
    println!("   3. Run: stemchat chat\n");

    Ok(())
}
