mod render;
mod run;

pub use render::*;
pub use run::run;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "notesly-console",
    version,
    about = "Operator console for the Notesly agent"
)]
pub struct Cli {
    /// Console config file (json, json5, yaml or toml).
    #[arg(short, long, global = true)]
    pub config: Option<String>,
    /// Agent base URL, overriding the config file.
    #[arg(short, long, global = true)]
    pub agent: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the pipeline with live module state.
    Status,
    /// Print the pipeline nodes and edges.
    Topology,
    /// Check that the agent answers.
    Health,
    /// Poll the agent and log node state changes until interrupted.
    Watch,
    /// Restart the agent.
    Restart,
    /// Read or change the agent's configuration.
    Config(ConfigOpts),
    /// Manage this console's own config file.
    ConsoleConfig(ConsoleConfigOpts),
    Version,
}

impl Commands {
    /// `console-config init` writes the file the other commands read.
    pub fn creates_console_config(&self) -> bool {
        matches!(
            self,
            Commands::ConsoleConfig(ConsoleConfigOpts {
                action: ConsoleConfigAction::Init
            })
        )
    }
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the agent's config catalog by group.
    Show {
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Stage KEY=VALUE edits and save them in one request.
    Set {
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
        /// Restart the agent after a successful save.
        #[arg(long)]
        restart: bool,
    },
}

#[derive(clap::Args)]
pub struct ConsoleConfigOpts {
    #[command(subcommand)]
    pub action: ConsoleConfigAction,
}

#[derive(Subcommand)]
pub enum ConsoleConfigAction {
    Show,
    Validate,
    Init,
}

/// Parse `KEY=VALUE`. The value may be empty or contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
