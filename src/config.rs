//! Run configuration.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `GITINGEST_*` environment variables. Every section is
//! `#[serde(default)]`, so a user file only needs the keys it changes and
//! nested tables merge onto the defaults key by key.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::output::OutputFormat;

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Complete configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub filters: FilterConfig,
    pub output: OutputConfig,
    pub database: DatabaseConfig,
    pub tree: TreeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name; empty means "use the root directory name".
    pub name: String,
    pub output_format: OutputFormat,
    pub output_file: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            output_format: OutputFormat::Markdown,
            output_file: "app_summary.md".to_string(),
        }
    }
}

/// Exclusion and sensitivity policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Directory names whose contents are never processed.
    pub exclude_dirs: Vec<String>,
    /// Extensions (with or without a leading dot) that are never processed.
    pub exclude_extensions: Vec<String>,
    /// Size ceiling in KiB. Files strictly larger are excluded.
    pub max_file_size: u64,
    /// Case-insensitive substrings that mark a file name as sensitive.
    pub sensitive_patterns: Vec<String>,
    /// Case-insensitive regexes that mark leading file content as sensitive.
    pub sensitive_content_patterns: Vec<String>,
}

impl FilterConfig {
    /// Size ceiling in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size.saturating_mul(1024)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: strings(&[
                ".git",
                ".hg",
                ".svn",
                "node_modules",
                "__pycache__",
                ".venv",
                "venv",
                ".tox",
                ".mypy_cache",
                ".pytest_cache",
                ".idea",
                ".vscode",
                "target",
                "dist",
                "coverage",
            ]),
            exclude_extensions: strings(&[
                ".pyc", ".pyo", ".pyd", ".class", ".o", ".obj", ".a", ".lib", ".exe", ".dll",
                ".so", ".dylib", ".jar", ".war",
            ]),
            max_file_size: 200,
            sensitive_patterns: strings(&[
                ".env",
                "secret",
                "credential",
                "password",
                "passwd",
                ".htpasswd",
                "id_rsa",
                "id_dsa",
                "id_ecdsa",
                "id_ed25519",
                ".pem",
                ".p12",
                ".pfx",
                ".key",
                ".keystore",
            ]),
            sensitive_content_patterns: strings(&[
                r#"(api[_-]?key|secret[_-]?key|access[_-]?token|auth[_-]?token)\s*[:=]\s*['"]?[a-z0-9_\-/+]{8,}"#,
                r#"password\s*[:=]\s*['"][^'"]{4,}['"]"#,
                r"-----BEGIN (RSA |EC |DSA |OPENSSH |PGP )?PRIVATE KEY( BLOCK)?-----",
                r"AKIA[0-9A-Z]{16}",
                r"gh[pousr]_[A-Za-z0-9]{36}",
                r"xox[baprs]-[A-Za-z0-9-]{10,}",
            ]),
        }
    }
}

/// Content extraction and rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Per-file line cap; 0 disables truncation.
    pub max_content_lines: usize,
    /// Emit a size note for binary files instead of an empty body.
    pub include_binary_info: bool,
    /// Emit per-file size/encoding/line metadata.
    pub include_metadata: bool,
    /// Emit the statistics section.
    pub include_file_stats: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_content_lines: 5000,
            include_binary_info: true,
            include_metadata: true,
            include_file_stats: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Summarize recognized database files instead of decoding them.
    pub enabled: bool,
    /// Capture per-table column lists for SQLite files.
    pub extract_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extract_schema: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Depth limit for the rendered tree.
    pub max_depth: usize,
    pub show_hidden: bool,
    pub follow_symlinks: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            show_hidden: true,
            follow_symlinks: false,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Parse a TOML document; missing keys keep their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitingest::config::Config;
    ///
    /// let config = Config::from_toml_str("[filters]\nmax_file_size = 64\n").unwrap();
    /// assert_eq!(config.filters.max_file_size, 64);
    /// assert!(!config.filters.exclude_dirs.is_empty());
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then the user file, then environment overrides.
    ///
    /// A missing or malformed user file is logged and ignored so a run can
    /// always proceed with the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = match path {
            Some(path) => Self::from_file(path).unwrap_or_else(|e| {
                warn!("{e}; using default configuration");
                Self::default()
            }),
            None => Self::default(),
        };
        config.apply_env_overrides();
        config
    }

    /// Apply `GITINGEST_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Values that fail to parse
    /// are logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GITINGEST_OUTPUT_FORMAT") {
            match value.parse() {
                Ok(format) => self.project.output_format = format,
                Err(e) => warn!("ignoring GITINGEST_OUTPUT_FORMAT: {e}"),
            }
        }

        if let Some(value) = lookup("GITINGEST_OUTPUT_FILE") {
            self.project.output_file = value;
        }

        if let Some(size) = parse_override::<u64>(&lookup, "GITINGEST_MAX_FILE_SIZE") {
            self.filters.max_file_size = size;
        }

        if let Some(depth) = parse_override::<usize>(&lookup, "GITINGEST_TREE_DEPTH") {
            self.tree.max_depth = depth;
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_override<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let value = lookup(key)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("ignoring {key}: invalid value {value:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.filters.max_file_size_bytes(), 200 * 1024);
        assert_eq!(config.output.max_content_lines, 5000);
        assert!(config.database.enabled);
        assert!(!config.database.extract_schema);
        assert_eq!(config.project.output_format, OutputFormat::Markdown);
        assert!(config.filters.exclude_dirs.contains(&".git".to_string()));
    }

    #[test]
    fn test_partial_file_merges_onto_defaults() {
        let config = Config::from_toml_str(
            r#"
[project]
name = "demo"

[output]
max_content_lines = 10
"#,
        )
        .unwrap();

        assert_eq!(config.project.name, "demo");
        assert_eq!(config.project.output_file, "app_summary.md");
        assert_eq!(config.output.max_content_lines, 10);
        assert!(config.output.include_binary_info);
        assert_eq!(config.filters, FilterConfig::default());
    }

    #[test]
    fn test_lists_replace_defaults() {
        let config = Config::from_toml_str("[filters]\nexclude_dirs = [\"vendor\"]\n").unwrap();
        assert_eq!(config.filters.exclude_dirs, vec!["vendor".to_string()]);
    }

    #[test]
    fn test_output_format_parsing() {
        let config = Config::from_toml_str("[project]\noutput_format = \"json\"\n").unwrap();
        assert_eq!(config.project.output_format, OutputFormat::Json);
        assert!(Config::from_toml_str("[project]\noutput_format = \"xml\"\n").is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(matches!(
            Config::from_toml_str("[filters\nmax_file_size = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/gitingest.toml")));
        assert_eq!(config.filters, FilterConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gitingest.toml");
        std::fs::write(&path, "[tree]\nmax_depth = 2\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.tree.max_depth, 2);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GITINGEST_OUTPUT_FORMAT", "json"),
            ("GITINGEST_OUTPUT_FILE", "out.json"),
            ("GITINGEST_MAX_FILE_SIZE", "42"),
            ("GITINGEST_TREE_DEPTH", "3"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.project.output_format, OutputFormat::Json);
        assert_eq!(config.project.output_file, "out.json");
        assert_eq!(config.filters.max_file_size, 42);
        assert_eq!(config.tree.max_depth, 3);
    }

    #[test]
    fn test_invalid_env_overrides_are_skipped() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "GITINGEST_MAX_FILE_SIZE" => Some("lots".to_string()),
            "GITINGEST_TREE_DEPTH" => Some("-1".to_string()),
            "GITINGEST_OUTPUT_FORMAT" => Some("yaml".to_string()),
            _ => None,
        });

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = Config::default().to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), Config::default());
    }
}
