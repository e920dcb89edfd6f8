// Minimal proof-of-work blockchain node - CLI entry point

use clap::Parser;
use minichain::cli::{execute, Cli};

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
