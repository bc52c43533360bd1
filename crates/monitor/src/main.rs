//! The binary for running the keeper registry monitor.

use keeper_monitor::cli::Cli;

#[tokio::main]
async fn main() {
    let _guards = keeper_tracing::init_logging().unwrap();

    if let Err(e) = Cli::run().await {
        println!("Error: {}", e);
        std::process::exit(1);
    }
}
