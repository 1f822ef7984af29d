//! Inspect command: sample stored chunks for a site

use super::query_context;
use crate::app::{InspectArgs, OutputFormat};
use crate::output::{format_inspection, Inspection};
use anyhow::Result;
use sitechat_core::providers::build_store;
use sitechat_core::{Config, EqualityFilter};

pub async fn run(args: InspectArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let ctx = query_context("", &args.scope, config)?;
    let store = build_store(&config.store)?;

    let filter = EqualityFilter::for_scope(&ctx.site_id, ctx.run_id.as_deref());
    let docs = store.sample(&filter, args.limit).await?;

    let inspection = Inspection {
        store: store.name().to_string(),
        site_id: ctx.site_id,
        run_id: ctx.run_id,
        expected_dimensions: config.embedding.dimensions,
        documents: docs,
    };
    print!("{}", format_inspection(&inspection, format));
    Ok(())
}
