//! Path exclusion rules.
//!
//! Two independent predicates live here:
//!
//! - [`IgnoreRuleSet::is_ignored`] applies ignore-file patterns
//!   (`.gitignore`, `.gitingestignore`) during discovery.
//! - [`FileFilter::should_exclude`] applies the configured policy
//!   (directory denylist, extension denylist, size ceiling) to files.
//!
//! [`is_text_like`] is the cheap extension heuristic used to decide whether a
//! file is worth a sensitive-content regex pass.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use glob::Pattern;
use tracing::warn;

use crate::config::FilterConfig;
use crate::walker::DiscoveredEntry;

/// Ignore files read from the project root, in order.
pub const IGNORE_FILES: &[&str] = &[".gitignore", ".gitingestignore"];

/// Why a file was dropped by [`FileFilter::should_exclude`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// A parent directory is on the denylist.
    Directory,
    /// The extension is on the denylist.
    Extension,
    /// The file is larger than the configured ceiling.
    Size,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Directory => write!(f, "directory"),
            Exclusion::Extension => write!(f, "extension"),
            Exclusion::Size => write!(f, "size"),
        }
    }
}

/// Policy filter built once per run from [`FilterConfig`].
#[derive(Debug, Clone)]
pub struct FileFilter {
    exclude_dirs: HashSet<String>,
    exclude_extensions: HashSet<String>,
    max_file_size: u64,
}

impl FileFilter {
    /// Build a filter from configuration. Extensions are normalized to
    /// lowercase without a leading dot.
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            exclude_dirs: config.exclude_dirs.iter().cloned().collect(),
            exclude_extensions: config
                .exclude_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
            max_file_size: config.max_file_size_bytes(),
        }
    }

    /// Size ceiling in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// First matching exclusion for `entry`, checked in order: directory,
    /// extension, size.
    pub fn should_exclude(&self, entry: &DiscoveredEntry) -> Option<Exclusion> {
        if self.in_excluded_dir(entry) {
            return Some(Exclusion::Directory);
        }

        if let Some(ext) = &entry.extension {
            if self.exclude_extensions.contains(ext) {
                return Some(Exclusion::Extension);
            }
        }

        if entry.size > self.max_file_size {
            return Some(Exclusion::Size);
        }

        None
    }

    /// Whether any parent directory of `entry` is on the denylist.
    pub fn in_excluded_dir(&self, entry: &DiscoveredEntry) -> bool {
        entry
            .parent_segments()
            .any(|segment| self.exclude_dirs.contains(segment))
    }

    /// Whether `entry` is a denylisted directory or lives inside one. Such
    /// entries are left out of the tree as well as the contents.
    pub fn hides(&self, entry: &DiscoveredEntry) -> bool {
        (!entry.is_file && self.exclude_dirs.contains(&entry.name)) || self.in_excluded_dir(entry)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

// ============================================================================
// Ignore-file patterns
// ============================================================================

#[derive(Debug, Clone)]
enum PatternKind {
    /// `dir/` style: matches the directory itself and everything below it.
    Directory { prefix: String, glob: Option<Pattern> },
    /// Matches the bare name or the full relative path.
    Glob { glob: Pattern, anchored: bool },
}

#[derive(Debug, Clone)]
struct IgnorePattern {
    source: String,
    kind: PatternKind,
}

impl IgnorePattern {
    fn compile(source: &str) -> Option<Self> {
        let anchored = source.starts_with('/');
        let body = source.trim_start_matches('/');

        let kind = if let Some(dir) = body.strip_suffix('/') {
            let dir = dir.trim_end_matches('/');
            if dir.is_empty() {
                return None;
            }
            PatternKind::Directory {
                prefix: dir.to_string(),
                glob: Pattern::new(dir).ok(),
            }
        } else {
            match Pattern::new(body) {
                Ok(glob) => PatternKind::Glob { glob, anchored },
                Err(e) => {
                    warn!("skipping invalid ignore pattern {source:?}: {e}");
                    return None;
                }
            }
        };

        Some(Self {
            source: source.to_string(),
            kind,
        })
    }

    fn matches(&self, relative: &str, name: &str) -> bool {
        match &self.kind {
            PatternKind::Directory { prefix, glob } => {
                relative == prefix
                    || glob.as_ref().is_some_and(|g| g.matches(relative))
                    || relative
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            PatternKind::Glob { glob, anchored } => {
                (!anchored && glob.matches(name)) || glob.matches(relative)
            }
        }
    }
}

/// Ignore-file patterns split into plain and negated (`!`) rules.
///
/// Negated rules always win: if any of them matches, the entry is kept no
/// matter how many plain rules also match.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    patterns: Vec<IgnorePattern>,
    negated: Vec<IgnorePattern>,
}

impl IgnoreRuleSet {
    /// Parse ignore-file text. Blank lines and `#` comments are skipped;
    /// invalid globs are logged and dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use gitingest::filter::IgnoreRuleSet;
    ///
    /// let rules = IgnoreRuleSet::parse("*.log\n!keep.log\n");
    /// assert_eq!(rules.len(), 2);
    /// ```
    pub fn parse(text: &str) -> Self {
        let mut rules = Self::default();
        rules.extend_from_str(text);
        rules
    }

    /// Read every file in [`IGNORE_FILES`] found in `root`. Missing files
    /// contribute nothing; unreadable ones are logged and skipped.
    pub fn load(root: &Path) -> Self {
        let mut rules = Self::default();
        for name in IGNORE_FILES {
            let path = root.join(name);
            if !path.is_file() {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(text) => rules.extend_from_str(&text),
                Err(e) => warn!("could not read {}: {e}", path.display()),
            }
        }
        rules
    }

    fn extend_from_str(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(negated) = line.strip_prefix('!') {
                if let Some(pattern) = IgnorePattern::compile(negated) {
                    self.negated.push(pattern);
                }
            } else if let Some(pattern) = IgnorePattern::compile(line) {
                self.patterns.push(pattern);
            }
        }
    }

    /// Whether the ignore-file rules drop `entry`.
    pub fn is_ignored(&self, entry: &DiscoveredEntry) -> bool {
        self.is_ignored_path(&entry.relative_str(), &entry.name)
    }

    /// Same as [`is_ignored`](Self::is_ignored) for a `/`-separated relative
    /// path and its final component.
    pub fn is_ignored_path(&self, relative: &str, name: &str) -> bool {
        if self.negated.iter().any(|p| p.matches(relative, name)) {
            return false;
        }
        self.patterns.iter().any(|p| p.matches(relative, name))
    }

    /// Plain pattern sources, in file order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }

    /// Negated pattern sources (without the `!`), in file order.
    pub fn negated_patterns(&self) -> impl Iterator<Item = &str> {
        self.negated.iter().map(|p| p.source.as_str())
    }

    /// Total number of rules.
    pub fn len(&self) -> usize {
        self.patterns.len() + self.negated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Text heuristic
// ============================================================================

/// Extensions that are never scanned for sensitive content.
const BINARY_EXTENSIONS: &[&str] = &[
    // executables and objects
    "exe", "dll", "so", "dylib", "bin", "wasm", "obj", "o",
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "svg", "webp",
    // audio / video
    "mp3", "mp4", "avi", "mov", "wav", "flac", "ogg",
    // archives
    "zip", "tar", "gz", "rar", "7z", "bz2", "xz",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
];

/// Cheap extension check: `false` for known binary formats, `true` for
/// everything else, including files without an extension.
pub fn is_text_like(entry: &DiscoveredEntry) -> bool {
    match &entry.extension {
        Some(ext) => !BINARY_EXTENSIONS.contains(&ext.as_str()),
        None => true,
    }
}
