//! The agent's pipeline as a fixed directed multigraph.
//!
//! Behavioural fields (`status_key`, `config_group`) live on the node
//! records; positions are kept in a separate layout map so projection and
//! grouping never depend on presentation data. Cycles are allowed.

mod projector;
mod reference;

pub use projector::*;
pub use reference::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    pub id: String,
    pub display_name: String,
    /// Catalog group edited when this node is opened.
    pub config_group: String,
    /// Module in the status snapshot; `None` for pure routing nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_key: Option<String>,
}

impl TopologyNode {
    pub fn new(id: &str, display_name: &str, config_group: &str, status_key: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            config_group: config_group.to_string(),
            status_key: status_key.map(str::to_string),
        }
    }
}

/// What travels along an edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Work handed downstream.
    Data,
    /// Results flowing back toward the user.
    Reply,
    /// Background synchronisation between stages.
    Sync,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopologyEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TopologyEdge {
    pub fn new(id: &str, source: &str, target: &str, kind: EdgeKind, label: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            kind,
            label: label.map(str::to_string),
        }
    }
}

/// Presentation-only position of a node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NodeLayout {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),
    #[error("duplicate edge id '{0}'")]
    DuplicateEdge(String),
    #[error("edge '{edge}' references unknown node '{node}'")]
    DanglingEdge { edge: String, node: String },
}

/// Read-only node and edge lists plus their layout.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<TopologyNode>,
    edges: Vec<TopologyEdge>,
    layout: HashMap<String, NodeLayout>,
}

impl Topology {
    /// Build a topology, checking id uniqueness and edge endpoints.
    pub fn new(
        nodes: Vec<TopologyNode>,
        edges: Vec<TopologyEdge>,
        layout: HashMap<String, NodeLayout>,
    ) -> Result<Self, TopologyError> {
        let mut node_ids = HashSet::new();
        for node in &nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(TopologyError::DuplicateNode(node.id.clone()));
            }
        }

        let mut edge_ids = HashSet::new();
        for edge in &edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(TopologyError::DuplicateEdge(edge.id.clone()));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint.as_str()) {
                    return Err(TopologyError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        Ok(Self {
            nodes,
            edges,
            layout,
        })
    }

    pub fn nodes(&self) -> &[TopologyNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[TopologyEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&TopologyNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn layout(&self, id: &str) -> Option<NodeLayout> {
        self.layout.get(id).copied()
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a TopologyEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a TopologyEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }
}
