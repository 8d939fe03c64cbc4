//! LeetCoach gateway CLI

use clap::Parser;

use leetcoach_gateway::cli::{execute, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}
