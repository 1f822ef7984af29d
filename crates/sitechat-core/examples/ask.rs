//! Answer one question using the configured services
//!
//! Usage: cargo run --example ask -- <site> <question...>

use sitechat_core::{Config, Providers, QueryContext, RetrievalPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let site = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: ask <site> <question...>"))?;
    let question = args.collect::<Vec<_>>().join(" ");

    let config = Config::load()?;
    let pipeline = RetrievalPipeline::new(Providers::from_config(&config)?, &config.retrieval);

    let result = pipeline
        .retrieve_and_answer(&QueryContext::new(question, site))
        .await?;

    println!("{}\n", result.answer);
    for source in &result.sources {
        println!("{} (vec={:.4})", source.url, source.similarity);
    }
    Ok(())
}
