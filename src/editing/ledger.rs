use std::collections::BTreeMap;

/// Staged config edits that the agent has not confirmed yet.
///
/// An entry overrides the catalog value for display and submission. An
/// empty value is never stored: setting a key to `""` drops it, which
/// reverts the field to the agent's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditLedger {
    edits: BTreeMap<String, String>,
}

impl EditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `value` for `key`, or drop the edit when `value` is empty.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.edits.remove(&key);
        } else {
            self.edits.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.edits.get(key).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }

    pub fn has_pending(&self) -> bool {
        !self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Copy of the pending edits, used as the save payload.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.edits.clone()
    }
}
