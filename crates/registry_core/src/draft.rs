use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{EntityKind, KeyValueStore};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 100;

/// Add-form field values persisted under a fixed key across navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSlot {
    key: String,
}

impl DraftSlot {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn for_entity(kind: EntityKind) -> Self {
        Self::new(kind.draft_key())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stored draft, or `None` when absent or no longer parseable as `T`.
    pub fn load<T: DeserializeOwned>(&self, store: &dyn KeyValueStore) -> Option<T> {
        let raw = store.get(&self.key)?;
        serde_json::from_str(&raw).ok()
    }

    /// Persists `draft`; called on every edit.
    pub fn save<T: Serialize>(&self, store: &dyn KeyValueStore, draft: &T) {
        if let Ok(json) = serde_json::to_string(draft) {
            store.set(&self.key, &json);
        }
    }

    /// Drops the draft after a successful submit or an explicit reset.
    pub fn clear(&self, store: &dyn KeyValueStore) {
        store.remove(&self.key);
    }
}

/// Trimmed name when its length is within the accepted bounds.
pub fn validate_name(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    let len = trimmed.chars().count();
    (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct LocationDraft {
        name: String,
    }

    #[test]
    fn draft_survives_until_cleared() {
        let store = MemoryStore::new();
        let slot = DraftSlot::for_entity(EntityKind::Location);
        assert_eq!(slot.load::<LocationDraft>(&store), None);

        slot.save(&store, &LocationDraft { name: "Ware".into() });
        slot.save(&store, &LocationDraft { name: "Warehouse".into() });
        assert_eq!(
            slot.load::<LocationDraft>(&store),
            Some(LocationDraft { name: "Warehouse".into() })
        );
        assert!(store.get("add-location-draft-v1").is_some());

        slot.clear(&store);
        assert_eq!(slot.load::<LocationDraft>(&store), None);
    }

    #[test]
    fn incompatible_draft_is_ignored() {
        let store = MemoryStore::new();
        let slot = DraftSlot::new("add-location-draft-v1");
        store.set(slot.key(), "[1, 2]");
        assert_eq!(slot.load::<LocationDraft>(&store), None);
    }

    #[test]
    fn name_bounds_apply_after_trim() {
        assert_eq!(validate_name("  A "), None);
        assert_eq!(validate_name("  Ab "), Some("Ab"));
        assert_eq!(validate_name(&"x".repeat(101)), None);
        assert_eq!(validate_name(&"x".repeat(100)).map(str::len), Some(100));
    }
}
