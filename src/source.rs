//! Source text retrieval for profiled lines
//!
//! The profiler only needs "give me line N of file F". Lookups are best-effort:
//! a missing file, unreadable file or out-of-range line yields `None`, which the
//! report renders as an empty source column.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Resolves a `(file, line)` pair to the literal text of that line
pub trait SourceLookup {
    /// Text of the 1-based `line` in `file`, or `None` if unavailable
    fn get_line(&self, file: &str, line: u32) -> Option<String>;
}

type CachedFile = Option<Arc<Vec<String>>>;

/// Reads source files from disk, caching each file's lines after first use
///
/// Relative paths (as produced by `file!()`) are tried against each source root
/// in order. Absolute paths are read directly.
#[derive(Debug)]
pub struct FileSourceLookup {
    roots: Vec<PathBuf>,
    cache: Mutex<HashMap<String, CachedFile>>,
}

impl Default for FileSourceLookup {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}

impl FileSourceLookup {
    /// Create a lookup resolving relative paths against `roots`
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn candidates(&self, file: &str) -> Vec<PathBuf> {
        let path = Path::new(file);
        if path.is_absolute() {
            vec![path.to_path_buf()]
        } else {
            self.roots.iter().map(|root| root.join(path)).collect()
        }
    }

    fn load(&self, file: &str) -> CachedFile {
        for candidate in self.candidates(file) {
            match std::fs::read_to_string(&candidate) {
                Ok(contents) => {
                    tracing::debug!("Loaded source {}", candidate.display());
                    let lines = contents.lines().map(str::to_string).collect();
                    return Some(Arc::new(lines));
                }
                Err(e) => {
                    tracing::trace!("Cannot read {}: {}", candidate.display(), e);
                }
            }
        }
        None
    }

    fn lines(&self, file: &str) -> CachedFile {
        if let Some(cached) = self.cache.lock().get(file) {
            return cached.clone();
        }
        // Read outside the lock; a racing load of the same file is harmless.
        let loaded = self.load(file);
        self.cache
            .lock()
            .entry(file.to_string())
            .or_insert(loaded)
            .clone()
    }

    /// Drop all cached file contents
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl SourceLookup for FileSourceLookup {
    fn get_line(&self, file: &str, line: u32) -> Option<String> {
        let index = (line as usize).checked_sub(1)?;
        self.lines(file)?.get(index).cloned()
    }
}

/// In-memory source files, for generated code and tests
#[derive(Debug, Default, Clone)]
pub struct MemorySourceLookup {
    files: HashMap<String, Vec<String>>,
}

impl MemorySourceLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the full contents of `file`
    pub fn with_file(mut self, file: impl Into<String>, contents: &str) -> Self {
        self.insert(file, contents);
        self
    }

    pub fn insert(&mut self, file: impl Into<String>, contents: &str) {
        // split_inclusive keeps each line's terminator, like reading a file line by line
        let lines = contents.split_inclusive('\n').map(str::to_string).collect();
        self.files.insert(file.into(), lines);
    }
}

impl SourceLookup for MemorySourceLookup {
    fn get_line(&self, file: &str, line: u32) -> Option<String> {
        let index = (line as usize).checked_sub(1)?;
        self.files.get(file)?.get(index).cloned()
    }
}
