//! TopicForge CLI — recurring topical web-content pipeline.
//!
//! Resolves topical queries into page URLs, extracts and normalizes their
//! content, and keeps a text classifier trained on the accumulated corpus.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
