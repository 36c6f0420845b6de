use std::fmt;

/// One step into a JSON tree: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// An address inside a JSON value, built as an explicit segment list
/// and flattened to the `a.b[2].c` display form on demand.
///
/// The display string is never parsed back into segments; keys that
/// themselves contain `.` or `[` produce ambiguous display strings,
/// which callers addressing nodes by string inherit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    /// The root path (empty segment list, renders as "").
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of the object member `key` under this path.
    pub fn child_key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    /// Path of the array element `index` under this path.
    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// The rendered display form, used for mark-set membership.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) => {
                    if i > 0 {
                        write!(f, ".{}", key)?;
                    } else {
                        write!(f, "{}", key)?;
                    }
                }
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
