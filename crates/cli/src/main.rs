//! urbench CLI entry point.

use clap::Parser;
use colored::Colorize;
use urbench_cli::Cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    urbench_cli::init_tracing(cli.verbose());

    if let Err(e) = urbench_cli::run(cli).await {
        tracing::error!(error = %format!("{:#}", e), "urbench failed");
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
