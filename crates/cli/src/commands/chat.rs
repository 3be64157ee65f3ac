//! `stemchat chat`: interactive or single-message chat.

use std::path::Path;
use stemchat_assistant::{Assistant, ReplySource};
use stemchat_core::ChatTurn;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    language: Option<String>,
    offline: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;
    if offline {
        config.api_key = None;
    }

    let assistant = Assistant::from_config(&config).await?;
    let language = language.as_deref();

    if let Some(msg) = message {
        // Single message mode
        let reply = assistant.respond(&msg, &[], language).await?;
        println!("{}", reply.text);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  {} assistant, interactive mode", config.organization_name);
    println!();
    if assistant.has_llm() {
        println!("  Provider:  {}", config.provider);
        println!("  Model:     {}", config.model);
    } else {
        println!("  LLM:       off (answering from built-in rules)");
    }
    println!("  Knowledge: {}", assistant.cache().source_name());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut context: Vec<ChatTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    use std::io::Write;
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        let reply = assistant.respond(input, &context, language).await?;
        println!();
        for line in reply.text.lines() {
            println!("  Assistant > {line}");
        }
        if let ReplySource::Fallback { reason } = &reply.source {
            tracing::debug!(?reason, "Reply came from fallback rules");
        }
        println!();

        context.push(ChatTurn::new("user", input));
        context.push(ChatTurn::new("assistant", reply.text));

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
