use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tagsweep::{cli::Cli, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    run(cli).await
}
