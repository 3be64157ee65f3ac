//! `stemchat knowledge`: aggregate once and report what was loaded.

use std::path::Path;
use stemchat_assistant::Assistant;
use stemchat_knowledge::{FieldStatus, KnowledgeSnapshot, ProgramCategory};

use super::load_config;

pub async fn run(config_path: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let assistant = Assistant::from_config(&config).await?;
    let cache = assistant.cache();
    let snapshot = cache.refresh().await;

    if json {
        println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
        return Ok(());
    }

    println!("Knowledge snapshot");
    println!("==================");
    println!("  Source:       {}", cache.source_name());
    if let Some(fetched_at) = cache.fetched_at().await {
        println!("  Fetched at:   {}", fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("  TTL:          {} min", cache.ttl().as_secs() / 60);
    println!();
    print_counts(&snapshot);
    println!();

    println!("  Queries:");
    for entry in &snapshot.report.queries {
        let status = match &entry.status {
            FieldStatus::Loaded { count } => format!("loaded ({count})"),
            FieldStatus::Empty => "empty".to_string(),
            FieldStatus::Degraded { reason } => format!("DEGRADED: {reason}"),
        };
        println!("    {:<36} {status}", entry.query);
    }

    let degraded = snapshot.report.degraded_count();
    if degraded > 0 {
        println!("\n  {degraded} queries degraded; answers use static facts for those fields.");
    }

    Ok(())
}

fn print_counts(snapshot: &KnowledgeSnapshot) {
    let facts = &snapshot.static_facts;
    println!(
        "  Static facts: {} impact stats, {} offices",
        facts.impact.len(),
        facts.offices.len()
    );
    println!(
        "  Profile:      {}",
        if snapshot.organization_profile.is_some() { "present" } else { "absent" }
    );
    for category in ProgramCategory::ALL {
        println!(
            "  {:<13} {}",
            format!("{}:", category.key()),
            snapshot.programs.get(category).len()
        );
    }
    println!("  Events:       {}", snapshot.events.len());
    println!("  Announcements: {}", snapshot.announcements.len());
    println!("  News:         {}", snapshot.news.len());
    println!(
        "  Contact:      {}",
        if snapshot.contact.is_some() { "present" } else { "absent" }
    );
}
