//! Ask command

use super::{build_pipeline, query_context};
use crate::app::{AskArgs, OutputFormat};
use crate::output::format_answer;
use anyhow::Result;
use sitechat_core::Config;

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let question = args.question.join(" ");
    let ctx = query_context(&question, &args.scope, config)?;
    let pipeline = build_pipeline(config)?;

    let result = pipeline.retrieve_and_answer(&ctx).await?;
    print!("{}", format_answer(&result, format));
    Ok(())
}
