use clap::Parser;
use opconf::cli::{self, Cli};
use opconf::config::Settings;
use opconf::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration
    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    logging::init_with_config(&settings.logging);

    if let Err(e) = cli::dispatch(cli.command, &settings).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
