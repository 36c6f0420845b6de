use serde_json::Value;

use crate::json_ops::{JsonOperations, to_pretty};
use crate::marks::MarkSet;
use crate::path::{JsonPath, Segment};
use crate::validate::{Validation, parse_checked};

/// Result of asking the session to mark or unmark a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Marked,
    Unmarked,
    /// The path addresses a protected root identity and was refused.
    Protected,
}

/// Everything ready to hand to the store: the transformed document
/// text (marked paths stripped, named arrays sorted) and its value.
#[derive(Debug, Clone)]
pub struct SavePlan {
    pub text: String,
    pub value: Value,
}

/// One open document: its raw text, its last-parsed structured value,
/// a dirty flag, and the paths marked for deletion.
///
/// The raw text is the source of truth at save time; the structured
/// value is refreshed from it only after validation passes. Structured
/// edits go the other way and regenerate the text immediately.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    filename: String,
    raw_text: String,
    value: Option<Value>,
    dirty: bool,
    marks: MarkSet,
}

impl DocumentSession {
    pub fn open(filename: &str, raw: &str, value: Value) -> Self {
        Self {
            filename: filename.to_string(),
            raw_text: raw.to_string(),
            value: Some(value),
            dirty: false,
            marks: MarkSet::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    /// A structured edit replaces the value and regenerates the raw
    /// text through the fixed 2-space serializer.
    pub fn edit_value(&mut self, value: Value) -> Result<(), String> {
        self.raw_text = to_pretty(&value)?;
        self.value = Some(value);
        self.dirty = true;
        Ok(())
    }

    /// A raw-text edit replaces the buffer only. The structured value
    /// is not re-parsed per edit; it goes stale until the next
    /// successful save.
    pub fn edit_raw(&mut self, text: &str) {
        self.raw_text = text.to_string();
        self.dirty = true;
    }

    /// Toggle a path in the pending-deletion set, refusing the
    /// protected root identities. The mutation engine itself has no
    /// such restriction; this is session policy.
    pub fn toggle_mark(&mut self, path: &JsonPath) -> ToggleOutcome {
        if self.is_protected(path) {
            return ToggleOutcome::Protected;
        }
        if self.marks.toggle(path) {
            ToggleOutcome::Marked
        } else {
            ToggleOutcome::Unmarked
        }
    }

    /// Toggle by rendered path string (for callers that address nodes
    /// by display form rather than segment lists). The same protected
    /// identities are refused.
    pub fn toggle_mark_rendered(&mut self, rendered: &str) -> ToggleOutcome {
        if rendered.is_empty() || self.is_protected_content(rendered) {
            return ToggleOutcome::Protected;
        }
        if self.marks.toggle_rendered(rendered) {
            ToggleOutcome::Marked
        } else {
            ToggleOutcome::Unmarked
        }
    }

    fn is_protected_content(&self, rendered: &str) -> bool {
        rendered == "Content"
            && self
                .value
                .as_ref()
                .and_then(|v| v.as_object())
                .and_then(|o| o.get("Content"))
                .map(Value::is_array)
                .unwrap_or(false)
    }

    // The root value itself ("Root Array") and a root-level "Content"
    // key holding an array cannot be marked.
    fn is_protected(&self, path: &JsonPath) -> bool {
        if path.is_root() {
            return true;
        }
        matches!(path.segments(), [Segment::Key(key)] if self.is_protected_content(key))
    }

    /// Run the pre-save pipeline: validate the raw text, parse it,
    /// strip marked paths, sort named arrays, re-serialize.
    ///
    /// On invalid JSON the structured error comes back and nothing
    /// changes; the session state is exactly as before.
    pub fn prepare_save(&self) -> Result<SavePlan, Validation> {
        let parsed = parse_checked(&self.raw_text)?;
        let stripped = if self.marks.is_empty() {
            parsed
        } else {
            JsonOperations::delete_marked(&parsed, &self.marks)
        };
        let sorted = JsonOperations::order_by_name(&stripped);
        let text = to_pretty(&sorted).map_err(|e| Validation {
            valid: false,
            error: Some(e),
            line: 1,
            column: 1,
        })?;
        Ok(SavePlan {
            text,
            value: sorted,
        })
    }

    /// Adopt a persisted plan as the new baseline: both views now show
    /// the saved content, the dirty flag drops, and the mark set is
    /// cleared.
    pub fn commit_saved(&mut self, plan: SavePlan) {
        self.raw_text = plan.text;
        self.value = Some(plan.value);
        self.dirty = false;
        self.marks.clear();
    }

    /// Whether the session may be replaced without confirmation.
    /// A dirty session requires the caller to confirm discarding.
    pub fn can_switch(&self) -> bool {
        !self.dirty
    }
}
