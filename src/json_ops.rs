use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::marks::MarkSet;
use crate::path::JsonPath;

/// Serialize with the fixed 2-space indentation every representation
/// of a document uses.
pub fn to_pretty(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to format JSON: {}", e))
}

pub struct JsonOperations;

impl JsonOperations {
    /// Remove every node whose rendered path is in `marks`, along with
    /// its entire subtree.
    ///
    /// Child paths are computed against the original pre-deletion
    /// indices during a single top-down pass; surviving array elements
    /// are reindexed contiguously in the output. A marked node is
    /// dropped without recursing into it, so deletion is
    /// subtree-atomic and idempotent for a fixed mark set.
    pub fn delete_marked(value: &Value, marks: &MarkSet) -> Value {
        Self::delete_at(value, &JsonPath::root(), marks)
    }

    fn delete_at(value: &Value, path: &JsonPath, marks: &MarkSet) -> Value {
        match value {
            Value::Array(items) => {
                let mut kept = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let child = path.child_index(index);
                    if marks.contains(&child) {
                        continue;
                    }
                    kept.push(Self::delete_at(item, &child, marks));
                }
                Value::Array(kept)
            }
            Value::Object(map) => {
                let mut kept = Map::new();
                for (key, item) in map {
                    let child = path.child_key(key);
                    if marks.contains(&child) {
                        continue;
                    }
                    kept.insert(key.clone(), Self::delete_at(item, &child, marks));
                }
                Value::Object(kept)
            }
            scalar => scalar.clone(),
        }
    }

    /// Sort every array of named objects ascending by its `Name`
    /// field, recursively.
    ///
    /// Children are transformed before the sort decision at each
    /// level, so nested sortable arrays sort independently of their
    /// ancestors. An array qualifies only when it is non-empty and
    /// every element is an object carrying a string `Name`; otherwise
    /// its order is left untouched.
    pub fn order_by_name(value: &Value) -> Value {
        match value {
            Value::Array(items) => {
                let mut transformed: Vec<Value> =
                    items.iter().map(Self::order_by_name).collect();
                if !transformed.is_empty() && transformed.iter().all(Self::has_string_name) {
                    transformed
                        .sort_by(|a, b| Self::compare_names(Self::name_of(a), Self::name_of(b)));
                }
                Value::Array(transformed)
            }
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, item) in map {
                    out.insert(key.clone(), Self::order_by_name(item));
                }
                Value::Object(out)
            }
            scalar => scalar.clone(),
        }
    }

    fn has_string_name(value: &Value) -> bool {
        value
            .as_object()
            .and_then(|o| o.get("Name"))
            .map(Value::is_string)
            .unwrap_or(false)
    }

    fn name_of(value: &Value) -> &str {
        value
            .as_object()
            .and_then(|o| o.get("Name"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    // Case-insensitive with a code-point tiebreak; the sort itself is
    // stable, so fully equal names keep their original relative order.
    fn compare_names(a: &str, b: &str) -> Ordering {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    }
}
