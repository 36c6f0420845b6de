use std::collections::HashSet;

use crate::path::JsonPath;

/// Paths pending deletion for one open document.
///
/// Membership is tested by exact string equality of the rendered path
/// form; nothing is normalized. The set is cleared on file switch and
/// after a save that applied deletions.
#[derive(Debug, Clone, Default)]
pub struct MarkSet {
    paths: HashSet<String>,
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the path if absent, remove it if present. Returns true
    /// when the path is marked after the call.
    pub fn toggle(&mut self, path: &JsonPath) -> bool {
        let rendered = path.render();
        if self.paths.remove(&rendered) {
            false
        } else {
            self.paths.insert(rendered);
            true
        }
    }

    /// Toggle an already-rendered path string. Membership is string
    /// equality, so this is equivalent to toggling the path it was
    /// rendered from.
    pub fn toggle_rendered(&mut self, rendered: &str) -> bool {
        if self.paths.remove(rendered) {
            false
        } else {
            self.paths.insert(rendered.to_string());
            true
        }
    }

    pub fn contains(&self, path: &JsonPath) -> bool {
        self.paths.contains(&path.render())
    }

    pub fn contains_rendered(&self, rendered: &str) -> bool {
        self.paths.contains(rendered)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}
