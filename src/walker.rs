//! Directory traversal.
//!
//! Uses the `ignore` crate's walker for the actual filesystem iteration but
//! turns off its built-in gitignore handling: ignore-file semantics are
//! applied by [`IgnoreRuleSet`] so that negated patterns behave the same way
//! on every platform and in every repository layout.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use ignore::WalkBuilder;
use thiserror::Error;
use tracing::debug;

use crate::filter::IgnoreRuleSet;

/// Errors that can occur during directory walking.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Include hidden files and directories.
    pub include_hidden: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_symlinks: false,
            include_hidden: true,
        }
    }
}

impl WalkOptions {
    /// Create options that skip dotfiles and dot-directories.
    pub fn without_hidden() -> Self {
        Self {
            include_hidden: false,
            ..Default::default()
        }
    }

    /// Set maximum depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// A filesystem entry found under the project root.
///
/// Created once per entry per scan and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEntry {
    /// Absolute (or root-joined) path used for reading.
    pub path: PathBuf,
    /// Path relative to the project root.
    pub relative_path: PathBuf,
    /// Final path component.
    pub name: String,
    /// Lowercased extension without the leading dot.
    pub extension: Option<String>,
    /// Size in bytes (0 for directories).
    pub size: u64,
    pub is_file: bool,
    pub is_hidden: bool,
    pub modified: Option<SystemTime>,
}

impl DiscoveredEntry {
    /// Build an entry by stat-ing `path`, relative to `root`.
    pub fn from_path(root: &Path, path: &Path) -> Result<Self, WalkError> {
        let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;
        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            relative_path,
            extension: extension_of(path),
            is_hidden: name.starts_with('.'),
            name,
            size: if metadata.is_file() { metadata.len() } else { 0 },
            is_file: metadata.is_file(),
            modified: metadata.modified().ok(),
        })
    }

    /// Relative path as a `/`-separated string, the key used everywhere
    /// downstream.
    pub fn relative_str(&self) -> String {
        relative_key(&self.relative_path)
    }

    /// Directory components of the relative path (excluding the final name).
    pub fn parent_segments(&self) -> impl Iterator<Item = &str> {
        let mut parts: Vec<&str> = self
            .relative_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();
        parts.pop();
        parts.into_iter()
    }

    /// Modification time as seconds since the Unix epoch.
    pub fn modified_secs(&self) -> Option<f64> {
        self.modified
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
}

fn relative_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn io_error(path: &Path, source: std::io::Error) -> WalkError {
    if source.kind() == std::io::ErrorKind::PermissionDenied {
        WalkError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        WalkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Walk `root` and return every entry below it that the ignore rules keep.
///
/// Order is whatever the filesystem yields; callers must not rely on it.
/// Entries that vanish or cannot be stat-ed mid-walk are skipped.
///
/// # Examples
///
/// ```no_run
/// use gitingest::filter::IgnoreRuleSet;
/// use gitingest::walker::{discover, WalkOptions};
/// use std::path::Path;
///
/// let root = Path::new(".");
/// let rules = IgnoreRuleSet::load(root);
/// for entry in discover(root, &WalkOptions::default(), &rules).unwrap() {
///     println!("{}", entry.relative_str());
/// }
/// ```
pub fn discover(
    root: &Path,
    options: &WalkOptions,
    rules: &IgnoreRuleSet,
) -> Result<Vec<DiscoveredEntry>, WalkError> {
    if !root.exists() {
        return Err(WalkError::NotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(!options.include_hidden)
        .follow_links(options.follow_symlinks)
        .max_depth(options.max_depth);

    let mut entries = Vec::new();
    for result in builder.build() {
        let dent = match result {
            Ok(dent) => dent,
            Err(ignore::Error::Io(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                debug!("skipping unreadable entry: {e}");
                continue;
            }
            Err(e) => {
                debug!("walk error: {e}");
                continue;
            }
        };

        if dent.depth() == 0 {
            continue;
        }

        let entry = match DiscoveredEntry::from_path(root, dent.path()) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping {}: {e}", dent.path().display());
                continue;
            }
        };

        if rules.is_ignored(&entry) {
            debug!("ignored by ignore file: {}", entry.relative_str());
            continue;
        }

        entries.push(entry);
    }

    Ok(entries)
}
