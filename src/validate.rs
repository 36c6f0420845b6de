use serde_json::Value;

/// Outcome of checking a raw text buffer for JSON validity.
///
/// On failure `line` and `column` are 1-based and point at the first
/// character the parser could not accept; on success they are 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub error: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            line: 0,
            column: 0,
        }
    }
}

/// Parse `text`, mapping any parser failure to a structured
/// `Validation` with a `Line N:` message and 1-based coordinates.
pub fn parse_checked(text: &str) -> Result<Value, Validation> {
    serde_json::from_str::<Value>(text).map_err(|e| {
        let line = e.line().max(1);
        let column = e.column().max(1);
        // serde_json appends " at line N column M"; strip it so the
        // message carries the location exactly once.
        let raw = e.to_string();
        let message = match raw.find(" at line ") {
            Some(pos) => raw[..pos].to_string(),
            None => raw,
        };
        Validation {
            valid: false,
            error: Some(format!("Line {}: {}", line, message)),
            line,
            column,
        }
    })
}

/// Check whether `text` parses as JSON. Never panics.
pub fn validate(text: &str) -> Validation {
    match parse_checked(text) {
        Ok(_) => Validation::ok(),
        Err(report) => report,
    }
}
