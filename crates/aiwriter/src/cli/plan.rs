//! The `aiwriter plan` command: propose article titles for a site theme.

use aiwriter_core::llm::OpenAiClient;
use aiwriter_core::{Config, TitlePlanner};
use anyhow::Context;
use clap::Args;
use std::sync::Arc;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Theme of the destination site (e.g., "Camping und Outdoor")
    #[arg(required = true)]
    pub theme: String,

    /// Language code for the proposed titles
    #[arg(short, long, default_value = "de")]
    pub language: String,

    /// Number of titles to propose
    #[arg(short, long, default_value = "5")]
    pub count: u32,

    /// Already-published title to avoid (repeatable)
    #[arg(long = "existing")]
    pub existing: Vec<String>,
}

/// Execute the plan command.
pub async fn execute(args: PlanArgs, config: Config) -> anyhow::Result<()> {
    let client = Arc::new(
        OpenAiClient::from_config(&config.completion, &config.limits)
            .context("Completion provider setup failed")?,
    );
    let planner = TitlePlanner::new(client);

    let titles = planner
        .plan(&args.theme, &args.language, args.count, &args.existing)
        .await
        .context("Title planning failed")?;

    // Titles go to stdout as JSON so they can be piped into `generate`
    println!("{}", serde_json::to_string_pretty(&titles)?);
    Ok(())
}
