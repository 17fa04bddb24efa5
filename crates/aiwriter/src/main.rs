//! Aiwriter CLI - One-shot article generation against the hosted pipeline.
//!
//! Aiwriter turns a topic into a complete SEO article bundle (HTML body,
//! meta tags, FAQ, structured data, images) and optionally delivers it to
//! a WordPress site via a signed webhook.
//!
//! # Usage
//!
//! ```bash
//! # Generate an article and write the bundle locally
//! aiwriter generate "Zelte für Wintercamping" --images 2 --output ./out
//!
//! # Generate and publish to a site
//! aiwriter generate "Zelte für Wintercamping" --domain blog.example.de --secret $SECRET
//!
//! # Plan article titles for a site theme
//! aiwriter plan "Camping und Outdoor" --count 5
//!
//! # View configuration
//! aiwriter config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Aiwriter - AI article generation pipeline for WordPress sites.
#[derive(Parser, Debug)]
#[command(name = "aiwriter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one article and deliver or save the bundle
    Generate(cli::generate::GenerateArgs),

    /// Plan article titles for a site theme
    Plan(cli::plan::PlanArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match aiwriter_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `aiwriter config path`."
            );
            aiwriter_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Aiwriter v{}", aiwriter_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Generate(args) => cli::generate::execute(args, config).await,
        Commands::Plan(args) => cli::plan::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
