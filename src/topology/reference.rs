use super::{EdgeKind, NodeLayout, Topology, TopologyEdge, TopologyNode};
use crate::agent::{STORAGE_MODULE, ZOOM_MODULE};

use std::collections::HashMap;

pub const NODE_TELEGRAM: &str = "telegram";
pub const NODE_ROUTER: &str = "router";
pub const NODE_TRANSCRIPTION: &str = "transcription";
pub const NODE_CHAT: &str = "chat";
pub const NODE_FILE_AGENT: &str = "file_analysis";
pub const NODE_STORAGE: &str = "storage";
pub const NODE_ZOOM: &str = "zoom";

/// The agent's intended pipeline: Telegram updates are routed to
/// transcription, conversation or the file agent; results land in storage
/// and replies flow back to Telegram.
pub fn reference_topology() -> Topology {
    let nodes = vec![
        TopologyNode::new(NODE_TELEGRAM, "Telegram Bot", "Telegram", None),
        TopologyNode::new(NODE_ROUTER, "Message Router", "Server", None),
        TopologyNode::new(
            NODE_TRANSCRIPTION,
            "Transcription",
            "Transcription",
            Some("transcription"),
        ),
        TopologyNode::new(NODE_CHAT, "Conversation", "Conversation", Some("chat")),
        TopologyNode::new(
            NODE_FILE_AGENT,
            "File Agent",
            "Claude Code Agent",
            Some("file_analysis"),
        ),
        TopologyNode::new(NODE_STORAGE, "Storage", "Storage", Some(STORAGE_MODULE)),
        TopologyNode::new(NODE_ZOOM, "Zoom Poller", "Zoom Integration", Some(ZOOM_MODULE)),
    ];

    let edges = vec![
        TopologyEdge::new(
            "telegram-router",
            NODE_TELEGRAM,
            NODE_ROUTER,
            EdgeKind::Data,
            Some("updates"),
        ),
        TopologyEdge::new(
            "router-transcription",
            NODE_ROUTER,
            NODE_TRANSCRIPTION,
            EdgeKind::Data,
            Some("voice, audio, video"),
        ),
        TopologyEdge::new("router-chat", NODE_ROUTER, NODE_CHAT, EdgeKind::Data, Some("text")),
        TopologyEdge::new(
            "router-file-agent",
            NODE_ROUTER,
            NODE_FILE_AGENT,
            EdgeKind::Data,
            Some("documents"),
        ),
        TopologyEdge::new(
            "transcription-storage",
            NODE_TRANSCRIPTION,
            NODE_STORAGE,
            EdgeKind::Data,
            Some("transcripts, summaries"),
        ),
        TopologyEdge::new(
            "file-agent-storage",
            NODE_FILE_AGENT,
            NODE_STORAGE,
            EdgeKind::Data,
            Some("files"),
        ),
        TopologyEdge::new(
            "storage-file-agent",
            NODE_STORAGE,
            NODE_FILE_AGENT,
            EdgeKind::Sync,
            Some("workspace sync"),
        ),
        TopologyEdge::new(
            "zoom-storage",
            NODE_ZOOM,
            NODE_STORAGE,
            EdgeKind::Data,
            Some("meeting transcripts"),
        ),
        TopologyEdge::new(
            "chat-telegram",
            NODE_CHAT,
            NODE_TELEGRAM,
            EdgeKind::Reply,
            Some("replies"),
        ),
    ];

    let layout: HashMap<String, NodeLayout> = [
        (NODE_TELEGRAM, 0.0, 160.0),
        (NODE_ROUTER, 220.0, 160.0),
        (NODE_TRANSCRIPTION, 460.0, 40.0),
        (NODE_CHAT, 460.0, 160.0),
        (NODE_FILE_AGENT, 460.0, 280.0),
        (NODE_STORAGE, 700.0, 160.0),
        (NODE_ZOOM, 700.0, 0.0),
    ]
    .into_iter()
    .map(|(id, x, y)| (id.to_string(), NodeLayout { x, y }))
    .collect();

    Topology {
        nodes,
        edges,
        layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_topology_is_well_formed() {
        let reference = reference_topology();
        let checked = Topology::new(
            reference.nodes().to_vec(),
            reference.edges().to_vec(),
            HashMap::new(),
        );
        assert!(checked.is_ok());
    }

    #[test]
    fn every_node_has_a_layout() {
        let reference = reference_topology();
        for node in reference.nodes() {
            assert!(reference.layout(&node.id).is_some(), "no layout for {}", node.id);
        }
    }

    #[test]
    fn has_reply_edge_back_to_ingress() {
        let reference = reference_topology();
        assert!(reference
            .incoming(NODE_TELEGRAM)
            .any(|e| e.source == NODE_CHAT && e.kind == EdgeKind::Reply));
    }

    #[test]
    fn routing_nodes_have_no_status_key() {
        let reference = reference_topology();
        assert!(reference.node(NODE_ROUTER).unwrap().status_key.is_none());
        assert!(reference.node(NODE_TELEGRAM).unwrap().status_key.is_none());
    }
}
