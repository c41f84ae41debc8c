//! Order Fulfilment CLI

use std::process;

mod cli;
mod observability;

#[tokio::main]
pub async fn main() {
    let cli = cli::Cli::load().unwrap_or_else(|error| error.exit());

    if let Err(error) = observability::init(&cli.logging) {
        eprintln!("{error}");
        process::exit(1);
    }

    if let Err(error) = cli.run().await {
        eprintln!("{error}");
        process::exit(1);
    }
}
