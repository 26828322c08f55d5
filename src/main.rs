use clap::Parser;
use notesly_console::cli::Cli;
use notesly_console::config::ConsoleConfig;
use notesly_console::logging;
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    // Logging settings come from the config file, so a bad -c path is
    // reported through the returned error rather than a log line.
    let config = if cli.command.creates_console_config() {
        ConsoleConfig::from_env()
    } else {
        ConsoleConfig::load(cli.config.as_deref())?
    };
    logging::init(&config.logging);
    debug!("Agent at {}", config.agent.base_url);

    notesly_console::cli::run(cli, config).await
}
