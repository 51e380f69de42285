//! Profiler configuration
//!
//! Configuration is optional. Everything has a default, a TOML file can
//! override it, and CLI flags override the file:
//!
//! ```toml
//! color = "never"
//! source_roots = [".", "crates/app"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::ColorMode;
use crate::error::{ProfileError, Result};
use crate::source::FileSourceLookup;

/// Settings shared by every session built from them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilerConfig {
    /// Whether report rows are colorized
    pub color: ColorMode,
    /// Directories that relative source paths are resolved against, in order
    pub source_roots: Vec<PathBuf>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            source_roots: default_source_roots(),
        }
    }
}

/// The working directory, the package directory when run under cargo, then
/// the directory lineprof itself was built from
fn default_source_roots() -> Vec<PathBuf> {
    let mut roots = vec![PathBuf::from(".")];
    if let Some(manifest_dir) = std::env::var_os("CARGO_MANIFEST_DIR") {
        roots.push(PathBuf::from(manifest_dir));
    }
    let build_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if !roots.contains(&build_dir) {
        roots.push(build_dir);
    }
    roots
}

impl ProfilerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ProfileError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded profiler config from {}", path.display());
        Ok(config)
    }

    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub fn with_source_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.source_roots = roots;
        self
    }

    /// File-backed source lookup over the configured roots
    pub fn source_lookup(&self) -> FileSourceLookup {
        FileSourceLookup::new(self.source_roots.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLookup;

    #[test]
    fn test_default_config() {
        let config = ProfilerConfig::default();
        assert_eq!(config.color, ColorMode::Auto);
        assert_eq!(config.source_roots[0], PathBuf::from("."));
        assert!(config
            .source_roots
            .contains(&PathBuf::from(env!("CARGO_MANIFEST_DIR"))));
    }

    #[test]
    fn test_default_roots_find_own_sources_anywhere() {
        let lookup = ProfilerConfig::default().source_lookup();
        let text = lookup.get_line(file!(), 1).unwrap();
        assert_eq!(text, "//! Profiler configuration");
    }

    #[test]
    fn test_parse_full_config() {
        let config = ProfilerConfig::from_toml_str(
            r#"
            color = "never"
            source_roots = ["src", "/opt/code"]
            "#,
        )
        .unwrap();
        assert_eq!(config.color, ColorMode::Never);
        assert_eq!(
            config.source_roots,
            vec![PathBuf::from("src"), PathBuf::from("/opt/code")]
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = ProfilerConfig::from_toml_str("color = \"always\"").unwrap();
        assert_eq!(config.color, ColorMode::Always);
        assert_eq!(config.source_roots, ProfilerConfig::default().source_roots);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = ProfilerConfig::from_toml_str("color = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ProfileError::Config(_)));

        let err = ProfilerConfig::from_toml_str("sort = \"percentage\"").unwrap_err();
        assert!(err.to_string().contains("sort"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineprof.toml");
        std::fs::write(&path, "color = \"never\"\n").unwrap();

        let config = ProfilerConfig::load(&path).unwrap();
        assert_eq!(config.color, ColorMode::Never);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProfilerConfig::load(Path::new("/nonexistent/lineprof.toml")).unwrap_err();
        assert!(matches!(err, ProfileError::Io(_)));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ProfilerConfig::default()
            .with_color(ColorMode::Never)
            .with_source_roots(vec![PathBuf::from("x")]);
        assert_eq!(config.color, ColorMode::Never);
        assert_eq!(config.source_roots, vec![PathBuf::from("x")]);
        assert_eq!(config.source_lookup().roots(), &[PathBuf::from("x")]);
    }
}
