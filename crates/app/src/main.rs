//! Mala ordering CLI

use std::process;

mod cli;

#[tokio::main]
pub async fn main() {
    if let Err(error) = cli::Cli::load().run().await {
        eprintln!("{error}");
        process::exit(1);
    }
}
