use crate::agent::ConfigItem;
use crate::topology::TopologyNode;

use std::collections::HashMap;

/// Catalog items partitioned by their `group` label.
///
/// Within a group, items keep their catalog order. Recompute whenever the
/// catalog changes; it borrows from the catalog it was built from.
#[derive(Debug, Default)]
pub struct ConfigGroups<'a> {
    groups: HashMap<&'a str, Vec<&'a ConfigItem>>,
    order: Vec<&'a str>,
}

impl<'a> ConfigGroups<'a> {
    /// Items of `label`, empty when no catalog item carries it.
    pub fn get(&self, label: &str) -> &[&'a ConfigItem] {
        self.groups.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fields a node edits. A node whose group matches nothing gets none.
    pub fn edit_surface(&self, node: &TopologyNode) -> &[&'a ConfigItem] {
        self.get(&node.config_group)
    }

    /// Group labels in order of first appearance.
    pub fn labels(&self) -> &[&'a str] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[&'a ConfigItem])> + '_ {
        self.order.iter().map(move |label| (*label, self.get(label)))
    }
}

/// Partition `catalog` by group in a single pass.
pub fn group_by(catalog: &[ConfigItem]) -> ConfigGroups<'_> {
    let mut groups: ConfigGroups<'_> = ConfigGroups::default();
    for item in catalog {
        let label = item.group.as_str();
        groups
            .groups
            .entry(label)
            .or_insert_with(|| {
                groups.order.push(label);
                Vec::new()
            })
            .push(item);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, group: &str) -> ConfigItem {
        ConfigItem {
            key: key.to_string(),
            group: group.to_string(),
            label: key.to_lowercase(),
            value: String::new(),
            is_set: false,
            required: false,
            secret: false,
            default: None,
        }
    }

    fn catalog() -> Vec<ConfigItem> {
        vec![
            item("TELEGRAM_BOT_TOKEN", "Telegram"),
            item("OPENAI_API_KEY", "Conversation"),
            item("TELEGRAM_API_ID", "Telegram"),
            item("S3_BUCKET", "Storage"),
            item("OPENAI_MODEL", "Conversation"),
        ]
    }

    #[test]
    fn groups_keep_item_order() {
        let catalog = catalog();
        let groups = group_by(&catalog);
        let keys: Vec<&str> = groups.get("Telegram").iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["TELEGRAM_BOT_TOKEN", "TELEGRAM_API_ID"]);
        assert_eq!(groups.labels(), &["Telegram", "Conversation", "Storage"]);
    }

    #[test]
    fn every_item_lands_in_exactly_one_group() {
        let catalog = catalog();
        let groups = group_by(&catalog);

        let mut seen: Vec<&str> = groups
            .iter()
            .flat_map(|(_, items)| items.iter().map(|i| i.key.as_str()))
            .collect();
        seen.sort_unstable();

        let mut expected: Vec<&str> = catalog.iter().map(|i| i.key.as_str()).collect();
        expected.sort_unstable();

        assert_eq!(seen, expected);
        for (label, items) in groups.iter() {
            assert!(items.iter().all(|i| i.group == label));
        }
    }

    #[test]
    fn unknown_group_has_empty_edit_surface() {
        let catalog = catalog();
        let groups = group_by(&catalog);
        let node = TopologyNode::new("router", "Message Router", "Server", None);
        assert!(groups.edit_surface(&node).is_empty());
    }

    #[test]
    fn empty_catalog() {
        let groups = group_by(&[]);
        assert!(groups.is_empty());
        assert!(groups.get("Telegram").is_empty());
    }
}
