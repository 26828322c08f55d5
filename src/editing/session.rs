use super::grouper::group_by;
use super::ledger::EditLedger;
use crate::agent::ConfigCatalog;
use crate::topology::TopologyNode;

use serde::Serialize;
use tracing::debug;

/// One form field of an opened node.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub key: String,
    pub label: String,
    /// Staged edit if any, else the agent's value. Secrets start empty.
    pub value: String,
    pub placeholder: String,
    pub required: bool,
    pub secret: bool,
    pub is_set: bool,
    /// A staged edit overrides the agent's value.
    pub dirty: bool,
}

/// Edits made while one node's config dialog is open.
#[derive(Debug, Clone)]
pub struct EditSession {
    node_id: String,
    config_group: String,
    ledger: EditLedger,
}

impl EditSession {
    pub fn open(node: &TopologyNode) -> Self {
        debug!("Opening edit session for {}", node.id);
        Self {
            node_id: node.id.clone(),
            config_group: node.config_group.clone(),
            ledger: EditLedger::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn config_group(&self) -> &str {
        &self.config_group
    }

    pub fn ledger(&self) -> &EditLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut EditLedger {
        &mut self.ledger
    }

    pub fn set_field(&mut self, key: &str, value: &str) {
        self.ledger.set(key, value);
    }

    /// Whether `key` belongs to this session's group in `catalog`.
    pub fn owns_key(&self, catalog: &ConfigCatalog, key: &str) -> bool {
        catalog
            .item(key)
            .is_some_and(|item| item.group == self.config_group)
    }

    /// Form fields for this node, in catalog order.
    pub fn fields(&self, catalog: &ConfigCatalog) -> Vec<FieldView> {
        let groups = group_by(&catalog.config);
        groups
            .get(&self.config_group)
            .iter()
            .map(|item| {
                let staged = self.ledger.get(&item.key);
                let value = match staged {
                    Some(v) => v.to_string(),
                    None if item.secret => String::new(),
                    None => item.value.clone(),
                };
                let placeholder = if item.secret && item.is_set {
                    item.value.clone()
                } else {
                    item.default.clone().unwrap_or_default()
                };
                FieldView {
                    key: item.key.clone(),
                    label: item.label.clone(),
                    value,
                    placeholder,
                    required: item.required,
                    secret: item.secret,
                    is_set: item.is_set,
                    dirty: staged.is_some(),
                }
            })
            .collect()
    }

    /// Required keys of this node that are neither set nor staged.
    pub fn missing_required(&self, catalog: &ConfigCatalog) -> Vec<String> {
        group_by(&catalog.config)
            .get(&self.config_group)
            .iter()
            .filter(|item| item.required && !item.is_set && self.ledger.get(&item.key).is_none())
            .map(|item| item.key.clone())
            .collect()
    }

    /// Discard the session. Returns how many staged edits were dropped.
    pub fn close(self) -> usize {
        if self.ledger.has_pending() {
            debug!(
                "Discarding {} unsaved edit(s) for {}",
                self.ledger.len(),
                self.node_id
            );
        }
        self.ledger.len()
    }
}
