//! Search command: ranked sources without an answer

use super::{build_retrieval_pipeline, query_context};
use crate::app::{AskArgs, OutputFormat};
use crate::output::format_retrieval;
use anyhow::Result;
use sitechat_core::Config;

pub async fn run(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let question = args.question.join(" ");
    let ctx = query_context(&question, &args.scope, config)?;
    let pipeline = build_retrieval_pipeline(config)?;

    let retrieval = pipeline.retrieve(&ctx).await?;
    print!(
        "{}",
        format_retrieval(&retrieval, pipeline.store_name(), format)
    );
    Ok(())
}
