use super::{NodeLayout, Topology};
use crate::agent::{ModuleStatus, StatusSnapshot, STORAGE_MODULE};

use serde::Serialize;

/// Joins subtitle segments.
pub const SUBTITLE_SEPARATOR: &str = " · ";

/// Live state of one node.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ModuleView {
    pub enabled: bool,
    pub subtitle: String,
}

/// A node ready to hand to the renderer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: String,
    pub display_name: String,
    pub enabled: bool,
    pub subtitle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<NodeLayout>,
}

/// Project a node's status key onto `{enabled, subtitle}`.
///
/// Nodes without a status key are always enabled. Without a snapshot, or
/// when the snapshot lacks the module, the node is disabled.
pub fn project(status_key: Option<&str>, snapshot: Option<&StatusSnapshot>) -> ModuleView {
    let Some(key) = status_key else {
        return ModuleView {
            enabled: true,
            subtitle: String::new(),
        };
    };

    match snapshot.and_then(|s| s.module(key)) {
        Some(module) => ModuleView {
            enabled: module.enabled,
            subtitle: subtitle(key, module),
        },
        None => ModuleView::default(),
    }
}

/// Provider, then model, then (storage only) the S3 and local segments.
fn subtitle(key: &str, module: &ModuleStatus) -> String {
    let mut parts: Vec<String> = Vec::new();

    for field in [&module.provider, &module.model] {
        if let Some(value) = field.as_deref().filter(|v| !v.is_empty()) {
            parts.push(value.to_string());
        }
    }

    if key == STORAGE_MODULE {
        if module.s3 == Some(true) {
            match module.s3_bucket.as_deref().filter(|b| !b.is_empty()) {
                Some(bucket) => parts.push(format!("S3: {bucket}")),
                None => parts.push("S3".to_string()),
            }
        }
        if module.local == Some(true) {
            parts.push("local".to_string());
        }
    }

    parts.join(SUBTITLE_SEPARATOR)
}

/// Project every node of `topology` against the latest snapshot.
pub fn node_views(topology: &Topology, snapshot: Option<&StatusSnapshot>) -> Vec<NodeView> {
    topology
        .nodes()
        .iter()
        .map(|node| {
            let view = project(node.status_key.as_deref(), snapshot);
            NodeView {
                id: node.id.clone(),
                display_name: node.display_name.clone(),
                enabled: view.enabled,
                subtitle: view.subtitle,
                layout: topology.layout(&node.id),
            }
        })
        .collect()
}
