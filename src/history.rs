/// Identifiers of events that have already triggered in the current world
/// session. Insertion order is preserved so serialization and sync are
/// deterministic; an identifier is never removed except by a full reset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlayHistory {
    ids: Vec<String>,
}

impl PlayHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|known| known == id)
    }

    /// Records an identifier as played. Idempotent; returns whether the
    /// identifier was newly added.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Replaces the whole history, e.g. from an authoritative sync response.
    /// Goes through `insert` so duplicates in the incoming list collapse.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = String>) {
        self.ids.clear();
        for id in ids {
            self.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut history = PlayHistory::new();
        assert!(history.insert("a"));
        assert!(!history.insert("a"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut history = PlayHistory::new();
        history.insert("x");
        history.insert("y");
        history.insert("z");
        let ids: Vec<_> = history.iter().collect();
        assert_eq!(ids, ["x", "y", "z"]);
    }

    #[test]
    fn replace_overwrites_and_dedups() {
        let mut history = PlayHistory::new();
        history.insert("c");
        history.replace(["a".to_string(), "b".to_string(), "a".to_string()]);
        let ids: Vec<_> = history.iter().collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(!history.contains("c"));
    }
}
