//! Terms command

use crate::app::{OutputFormat, TermsArgs};
use crate::output::format_terms;
use anyhow::Result;
use sitechat_core::extract_terms;

pub fn run(args: TermsArgs, format: OutputFormat) -> Result<()> {
    let terms = extract_terms(&args.question.join(" "));
    print!("{}", format_terms(&terms, format));
    Ok(())
}
