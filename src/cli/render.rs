//! Plain-text rendering for the CLI.

use crate::agent::{ConfigCatalog, StatusSnapshot};
use crate::editing::{group_by, CommitReport, RestartOutcome, SaveOutcome};
use crate::topology::{EdgeKind, NodeView, Topology};

use std::fmt::Write;

fn marker(enabled: bool) -> &'static str {
    if enabled {
        "[on ]"
    } else {
        "[off]"
    }
}

/// One line per node, with counters, deployment and recent errors when a
/// snapshot is available.
pub fn render_status(views: &[NodeView], snapshot: Option<&StatusSnapshot>) -> String {
    let mut out = String::new();

    match snapshot {
        Some(s) => {
            let name = if s.bot_name.is_empty() { "agent" } else { s.bot_name.as_str() };
            let uptime = s.uptime_display().unwrap_or_else(|| "not started".to_string());
            let _ = writeln!(out, "{name} (up {uptime})");
            if let Some(last) = &s.last_activity {
                let _ = writeln!(out, "last activity {last}");
            }
        }
        None => {
            let _ = writeln!(out, "agent status unavailable");
        }
    }

    for view in views {
        if view.subtitle.is_empty() {
            let _ = writeln!(out, "  {} {}", marker(view.enabled), view.display_name);
        } else {
            let _ = writeln!(
                out,
                "  {} {} ({})",
                marker(view.enabled),
                view.display_name,
                view.subtitle
            );
        }
    }

    if let Some(s) = snapshot {
        let c = &s.counters;
        let _ = writeln!(
            out,
            "transcriptions {}  chats {}  files {}",
            c.transcriptions, c.chats, c.files
        );

        let d = &s.deployment;
        let mut line = format!("deployment {}", d.kind);
        for (label, value) in [
            ("host", &d.hostname),
            ("ip", &d.private_ip),
            ("public", &d.public_ip),
            ("region", &d.region),
            ("runtime", &d.python),
            ("os", &d.os),
        ] {
            if !value.is_empty() {
                let _ = write!(line, "  {label} {value}");
            }
        }
        let _ = writeln!(out, "{line}");

        if !s.recent_errors.is_empty() {
            let _ = writeln!(out, "recent errors:");
            for err in &s.recent_errors {
                let _ = writeln!(out, "  {} {}", err.timestamp, err.message);
            }
        }
    }

    out
}

pub fn render_topology(topology: &Topology) -> String {
    let mut out = String::from("nodes:\n");
    for node in topology.nodes() {
        let status = node.status_key.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "  {:<14} {:<16} group={:<18} status={}",
            node.id, node.display_name, node.config_group, status
        );
    }
    out.push_str("edges:\n");
    for edge in topology.edges() {
        let arrow = match edge.kind {
            EdgeKind::Data => "->",
            EdgeKind::Reply => "=>",
            EdgeKind::Sync => "~>",
        };
        let _ = write!(out, "  {} {} {}", edge.source, arrow, edge.target);
        if let Some(label) = &edge.label {
            let _ = write!(out, "  [{label}]");
        }
        out.push('\n');
    }
    out
}

/// Catalog grouped by label; `group` restricts the output to one group.
pub fn render_catalog(catalog: &ConfigCatalog, group: Option<&str>) -> String {
    let mut out = String::new();
    let groups = group_by(&catalog.config);
    for (label, items) in groups.iter() {
        if group.is_some_and(|g| g != label) {
            continue;
        }
        let _ = writeln!(out, "{label}");
        for item in items {
            let value = if item.is_set {
                item.value.clone()
            } else {
                match &item.default {
                    Some(d) => format!("(default {d})"),
                    None => "(unset)".to_string(),
                }
            };
            let flag = if item.required && !item.is_set { " !" } else { "" };
            let _ = writeln!(out, "  {:<24} {:<28} {}{}", item.key, item.label, value, flag);
        }
    }
    if out.is_empty() {
        if let Some(g) = group {
            let _ = writeln!(out, "no configurable fields in '{g}'");
        }
    }
    out
}

pub fn render_report(report: &CommitReport) -> String {
    let mut out = String::new();
    match &report.save {
        SaveOutcome::NothingToSave => out.push_str("nothing to save\n"),
        SaveOutcome::Saved { accepted, ignored } => {
            let _ = writeln!(out, "saved {}", accepted.join(", "));
            if !ignored.is_empty() {
                let _ = writeln!(out, "ignored unknown keys {}", ignored.join(", "));
            }
        }
    }
    if let Some(restart) = &report.restart {
        out.push_str(&render_restart(restart));
    }
    out
}

pub fn render_restart(outcome: &RestartOutcome) -> String {
    match outcome {
        RestartOutcome::Restarted => "restart requested\n".to_string(),
        RestartOutcome::Initiated => "restart initiated\n".to_string(),
        RestartOutcome::Failed(e) => format!("restart failed: {e}\n"),
    }
}
