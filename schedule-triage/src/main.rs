use anyhow::Result;
use clap::Parser;

use schedule_triage::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    cli::run(cli).await
}
