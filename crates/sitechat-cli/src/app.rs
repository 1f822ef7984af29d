//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sitechat")]
#[command(
    author,
    version,
    about = "Ask questions about a crawled website, answered from its own pages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file (defaults to the user config dir)
    #[arg(long, global = true, env = "SITECHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer one question
    Ask(AskArgs),

    /// Interactive question loop
    Chat(ScopeArgs),

    /// Retrieve and rank sources without generating an answer
    Search(AskArgs),

    /// Show the search terms extracted from a question
    Terms(TermsArgs),

    /// Sample stored chunks and check embedding dimensions
    Inspect(InspectArgs),
}

#[derive(Args, Clone)]
pub struct ScopeArgs {
    /// Site to query (overrides site.site_id)
    #[arg(long)]
    pub site: Option<String>,

    /// Restrict to one ingestion run (overrides site.run_id)
    #[arg(long)]
    pub run: Option<String>,
}

#[derive(Args)]
pub struct AskArgs {
    /// Question
    #[arg(required = true)]
    pub question: Vec<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args)]
pub struct TermsArgs {
    /// Question
    #[arg(required = true)]
    pub question: Vec<String>,
}

#[derive(Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Number of chunks to sample
    #[arg(short = 'n', long, default_value = "5")]
    pub limit: usize,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Cli,
    Json,
}
