//! Interactive question loop

use super::{build_pipeline, query_context};
use crate::app::{OutputFormat, ScopeArgs};
use crate::output::format_answer;
use anyhow::Result;
use sitechat_core::Config;
use std::io::{BufRead, Write};

pub async fn run(args: ScopeArgs, config: &Config, format: OutputFormat) -> Result<()> {
    // Validate scope up front rather than on the first question
    let scope = query_context("", &args, config)?;
    let pipeline = build_pipeline(config)?;

    if format == OutputFormat::Cli {
        eprintln!(
            "Chatting with {}{} via {} (empty line, 'exit' or 'quit' to leave)",
            scope.site_id,
            scope
                .run_id
                .as_deref()
                .map(|r| format!(" | run_id={}", r))
                .unwrap_or_default(),
            pipeline.store_name()
        );
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nAsk: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let question = line?;
        let question = question.trim();
        if question.is_empty() || matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let ctx = query_context(question, &args, config)?;
        match pipeline.retrieve_and_answer(&ctx).await {
            Ok(result) => print!("{}", format_answer(&result, format)),
            Err(e) if e.is_config_error() => return Err(e.into()),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}
