use serde::{Deserialize, Serialize};

/// Per-file display metadata kept in `settings.json` inside the data
/// directory: an optional human title and an optional external URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub entries: Vec<SettingsEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsEntry {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Settings {
    pub fn entry_for(&self, filename: &str) -> Option<&SettingsEntry> {
        self.entries.iter().find(|e| e.filename == filename)
    }

    /// Insert or replace the entry for `filename`.
    pub fn set_entry(&mut self, entry: SettingsEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.filename == entry.filename)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}
