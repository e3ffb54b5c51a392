use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::PlayHistory;

pub const PLAYED_COUNT_KEY: &str = "PlayedMusicEventCount";
pub const PLAYED_EVENT_PREFIX: &str = "PlayedMusicEvent";

/// Key/value seam over whatever the host game uses for world-save data. Tag
/// encoding primitives live with the host; this crate only reads and writes
/// typed fields by key.
pub trait WorldTag {
    fn set_int(&mut self, key: &str, value: i32);
    fn set_string(&mut self, key: &str, value: &str);
    fn get_int(&self, key: &str) -> Option<i32>;
    fn get_string(&self, key: &str) -> Option<String>;
}

/// Writes the history as a count field plus one indexed string per entry.
pub fn save_history(history: &PlayHistory, tag: &mut dyn WorldTag) {
    tag.set_int(PLAYED_COUNT_KEY, history.len() as i32);

    for (i, id) in history.iter().enumerate() {
        tag.set_string(&format!("{PLAYED_EVENT_PREFIX}{i}"), id);
    }
}

/// Reads the history back. A missing count means empty history; an indexed
/// entry that is missing or fails to decode is skipped, not fatal.
pub fn load_history(tag: &dyn WorldTag) -> PlayHistory {
    let mut history = PlayHistory::new();

    let count = tag.get_int(PLAYED_COUNT_KEY).unwrap_or(0);
    for i in 0..count.max(0) {
        match tag.get_string(&format!("{PLAYED_EVENT_PREFIX}{i}")) {
            Some(id) => {
                history.insert(id);
            }
            None => {
                tracing::debug!(index = i, "skipping undecodable played-event entry");
            }
        }
    }

    history
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize tag store: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to parse tag store: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TagValue {
    Int(i32),
    Str(String),
}

/// Concrete tag implementation for hosts without an engine-provided tag
/// compound. Round-trips to RON on disk.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TagStore {
    values: HashMap<String, TagValue>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SaveError> {
        let ron_string = fs::read_to_string(path)?;
        let store: TagStore = ron::from_str(&ron_string)?;
        Ok(store)
    }
}

impl WorldTag for TagStore {
    fn set_int(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_string(), TagValue::Int(value));
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.to_string(), TagValue::Str(value.to_string()));
    }

    fn get_int(&self, key: &str) -> Option<i32> {
        match self.values.get(key) {
            Some(TagValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(key) {
            Some(TagValue::Str(v)) => Some(v.clone()),
            _ => None,
        }
    }
}
