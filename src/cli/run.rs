use super::{render, Cli, Commands, ConfigAction, ConsoleConfigAction};
use crate::agent::AgentApi;
use crate::config::{validate_config, ConsoleConfig};
use crate::console::{node_changes, Console};
use crate::editing::{CommitReport, EditLedger};
use crate::infra::shutdown::ShutdownSignal;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

/// Execute one CLI command against the configured agent.
pub async fn run(cli: Cli, mut config: ConsoleConfig) -> Result<()> {
    if let Some(agent) = cli.agent {
        config.agent.base_url = agent;
    }

    match cli.command {
        Commands::Status => {
            let console = console_for(&config)?;
            let snapshot = console.status().refresh().await.ok();
            print!(
                "{}",
                render::render_status(&console.node_views(), snapshot.as_deref())
            );
            if snapshot.is_none() {
                bail!("agent status unavailable");
            }
        }
        Commands::Topology => {
            let topology = crate::topology::reference_topology();
            print!("{}", render::render_topology(&topology));
        }
        Commands::Health => {
            let client = crate::agent::AgentClient::new(&config.agent)?;
            let health = client.health().await.context("health check failed")?;
            println!("{}", health.status);
        }
        Commands::Watch => {
            let console = console_for(&config)?;
            watch(&console).await?;
        }
        Commands::Restart => {
            let console = console_for(&config)?;
            let outcome = console.sequencer().restart().await?;
            print!("{}", render::render_restart(&outcome));
            if outcome.is_failure() {
                bail!("restart failed");
            }
        }
        Commands::Config(opts) => {
            let console = console_for(&config)?;
            match opts.action {
                ConfigAction::Show { group } => {
                    let catalog = console.catalog().refresh().await?;
                    println!("# {}", catalog.env_file);
                    print!("{}", render::render_catalog(&catalog, group.as_deref()));
                }
                ConfigAction::Set {
                    assignments,
                    restart,
                } => {
                    let report = set_config(&console, assignments, restart).await?;
                    print!("{}", render::render_report(&report));
                    if report.restart.as_ref().is_some_and(|r| r.is_failure()) {
                        bail!("config saved but restart failed");
                    }
                }
            }
        }
        Commands::ConsoleConfig(opts) => match opts.action {
            ConsoleConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConsoleConfigAction::Validate => {
                let errors = validate_config(&config);
                if errors.is_empty() {
                    info!("Configuration is valid");
                } else {
                    for e in &errors {
                        error!("{}", e);
                    }
                    bail!("{} configuration error(s)", errors.len());
                }
            }
            ConsoleConfigAction::Init => {
                let path = cli.config.as_deref().unwrap_or("notesly-console.json");
                ConsoleConfig::write_default(path)?;
                info!("Configuration file created at {}", path);
            }
        },
        Commands::Version => {
            println!("notesly-console {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn console_for(config: &ConsoleConfig) -> Result<Console> {
    let errors = validate_config(config);
    if let Some(first) = errors.first() {
        bail!("invalid console config: {}", first);
    }
    Ok(Console::from_config(config)?)
}

/// Stage every assignment into one ledger and commit it.
async fn set_config(
    console: &Console,
    assignments: Vec<(String, String)>,
    restart: bool,
) -> Result<CommitReport> {
    match console.catalog().refresh().await {
        Ok(catalog) => {
            for (key, _) in &assignments {
                if catalog.item(key).is_none() {
                    warn!("'{}' is not in the agent's config catalog", key);
                }
            }
        }
        Err(e) => warn!("Could not load config catalog: {}", e),
    }

    let mut ledger = EditLedger::new();
    for (key, value) in assignments {
        if value.is_empty() {
            warn!("Skipping empty value for {}", key);
        }
        ledger.set(key, value);
    }

    let sequencer = console.sequencer();
    let report = if restart {
        sequencer.save_and_restart(&mut ledger).await?
    } else {
        CommitReport {
            save: sequencer.save(&mut ledger).await?,
            restart: None,
        }
    };
    Ok(report)
}

/// Log node transitions on every status version until Ctrl-C.
async fn watch(console: &Console) -> Result<()> {
    let shutdown = ShutdownSignal::new();
    let ctrl_c = shutdown.trigger_on_ctrl_c();
    let pollers = console.start(&shutdown);
    let mut versions = console.status().subscribe();
    let mut previous = console.node_views();

    while let Some(Ok(())) = shutdown.run_until_triggered(versions.changed()).await {
        let current = console.node_views();
        for change in node_changes(&previous, &current) {
            let state = if change.enabled { "on" } else { "off" };
            info!(
                node = %change.id,
                "{} is {} {}",
                change.display_name,
                state,
                change.subtitle
            );
        }
        previous = current;
    }

    shutdown.trigger();
    for poller in pollers {
        let _ = poller.await;
    }
    let _ = ctrl_c.await;
    Ok(())
}
