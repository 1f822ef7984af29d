//! CLI command handlers

pub mod ask;
pub mod chat;
pub mod inspect;
pub mod search;
pub mod terms;

use crate::app::ScopeArgs;
use anyhow::Result;
use sitechat_core::{Config, Providers, QueryContext, RetrievalPipeline, SiteChatError};
use std::path::Path;

/// Load config from `--config`/`SITECHAT_CONFIG`, or the default location
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Build the query scope, with flags taking precedence over config
pub fn query_context(question: &str, scope: &ScopeArgs, config: &Config) -> Result<QueryContext> {
    let site_id = scope
        .site
        .clone()
        .or_else(|| config.site.site_id.clone())
        .ok_or_else(|| {
            SiteChatError::Config("missing site.site_id (SITECHAT_SITE or --site)".to_string())
        })?;
    let run_id = scope.run.clone().or_else(|| config.site.run_id.clone());

    Ok(QueryContext::new(question, site_id).with_run(run_id))
}

pub fn build_pipeline(config: &Config) -> Result<RetrievalPipeline> {
    let providers = Providers::from_config(config)?;
    Ok(RetrievalPipeline::new(providers, &config.retrieval))
}

/// Pipeline for commands that never generate an answer
pub fn build_retrieval_pipeline(config: &Config) -> Result<RetrievalPipeline> {
    let providers = Providers::retrieval_from_config(config)?;
    Ok(RetrievalPipeline::new(providers, &config.retrieval))
}
