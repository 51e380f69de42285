//! Line identifiers and the lazily-populated source text registry
//!
//! A [`LineId`] names one statement inside a traced scope by its source file
//! and line number. The [`LineRegistry`] remembers the literal text of each
//! line the first time time is attributed to it.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use crate::source::SourceLookup;

/// Source location of a single profiled statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId {
    /// Source file path as reported by the step source
    pub file: Cow<'static, str>,
    /// 1-based line number
    pub line: u32,
}

impl LineId {
    /// Line identifier for a static file path (as produced by `file!()`)
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self {
            file: Cow::Borrowed(file),
            line,
        }
    }

    /// Line identifier for a file path only known at runtime
    pub fn owned(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: Cow::Owned(file.into()),
            line,
        }
    }

    /// Whether both identifiers point into the same source file
    pub fn same_file(&self, other: &LineId) -> bool {
        self.file == other.file
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

impl From<&'static std::panic::Location<'static>> for LineId {
    fn from(location: &'static std::panic::Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

/// Deduplicated map from line identifier to the literal source text
#[derive(Debug, Default)]
pub struct LineRegistry {
    lines: HashMap<LineId, String>,
}

impl LineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up and store the text for `id` unless it is already known
    ///
    /// The lookup runs at most once per identifier. A failed lookup stores an
    /// empty string so the line is not retried.
    pub fn ensure(&mut self, id: &LineId, resolver: &dyn SourceLookup) {
        if self.lines.contains_key(id) {
            return;
        }
        let text = match resolver.get_line(&id.file, id.line) {
            Some(text) => text.trim_end_matches(['\n', '\r']).to_string(),
            None => {
                tracing::debug!("No source text for {}", id);
                String::new()
            }
        };
        self.lines.insert(id.clone(), text);
    }

    /// Source text for `id`, empty when it was never resolved
    pub fn text(&self, id: &LineId) -> &str {
        self.lines.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, id: &LineId) -> bool {
        self.lines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
