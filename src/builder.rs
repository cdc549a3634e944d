//! Fluent builder API for gitingest.
//!
//! [`Ingest`] wires discovery, the classification pipeline and tree
//! building together and returns a [`Digest`] ready for rendering.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::classify::{ClassifiedEntry, Content, Pipeline, RunStats};
use crate::config::Config;
use crate::encoding::EncodingResolver;
use crate::errors::IngestError;
use crate::filter::{FileFilter, IgnoreRuleSet};
use crate::tree::{build_tree, FileNode, Marker, RenderOptions};
use crate::walker::{discover, DiscoveredEntry, WalkError, WalkOptions};

/// Builder for a project digest.
///
/// # Examples
///
/// ```no_run
/// use gitingest::builder::Ingest;
/// use gitingest::config::Config;
///
/// let digest = Ingest::new("./project")
///     .config(Config::load(None))
///     .build()
///     .unwrap();
/// println!("{} files classified", digest.contents.len());
/// ```
pub struct Ingest {
    root: PathBuf,
    config: Config,
    resolver: Option<EncodingResolver>,
}

impl Ingest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: Config::default(),
            resolver: None,
        }
    }

    /// Use `config` instead of the built-in defaults.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Override the project name shown in the digest header.
    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.config.project.name = name.into();
        self
    }

    /// Include hidden files and directories.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.tree.show_hidden = include;
        self
    }

    /// Depth limit for the rendered tree. Classification is not limited.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.tree.max_depth = depth;
        self
    }

    /// Replace the encoding resolver used for decoding.
    pub fn encoding_resolver(mut self, resolver: EncodingResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Discover, classify and build the tree.
    pub fn build(self) -> Result<Digest, IngestError> {
        let root = checked_root(&self.root)?;
        let entries = discover(&root, &self.walk_options(), &IgnoreRuleSet::default())
            .map_err(walk_error)?;

        let mut pipeline = Pipeline::new(&self.config).with_rules(IgnoreRuleSet::load(&root));
        if let Some(resolver) = self.resolver {
            pipeline = pipeline.with_resolver(resolver);
        }
        let output = pipeline.run(entries);

        let filter = FileFilter::new(&self.config.filters);
        let visible: Vec<DiscoveredEntry> = output
            .entries
            .into_iter()
            .filter(|e| !filter.hides(e))
            .collect();

        let project_name = project_name(&self.config, &root);
        let tree = build_tree(&project_name, &visible, self.config.tree.max_depth);

        Ok(Digest {
            project_name,
            root,
            entries: visible,
            contents: output.contents,
            stats: output.stats,
            tree,
            generated_at: Local::now(),
        })
    }

    /// Build the tree only, without reading any file contents.
    pub fn tree(self) -> Result<FileNode, IngestError> {
        let root = checked_root(&self.root)?;
        let rules = IgnoreRuleSet::load(&root);
        let filter = FileFilter::new(&self.config.filters);
        let entries: Vec<DiscoveredEntry> = discover(&root, &self.walk_options(), &rules)
            .map_err(walk_error)?
            .into_iter()
            .filter(|e| !filter.hides(e))
            .collect();

        Ok(build_tree(
            &project_name(&self.config, &root),
            &entries,
            self.config.tree.max_depth,
        ))
    }

    fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            max_depth: None,
            follow_symlinks: self.config.tree.follow_symlinks,
            include_hidden: self.config.tree.show_hidden,
        }
    }
}

/// A classified project, ready to render.
#[derive(Debug, Clone)]
pub struct Digest {
    pub project_name: String,
    /// Canonical project root.
    pub root: PathBuf,
    /// Files and directories shown in the tree.
    pub entries: Vec<DiscoveredEntry>,
    /// Classified files keyed by `/`-separated relative path.
    pub contents: HashMap<String, ClassifiedEntry>,
    pub stats: RunStats,
    pub tree: FileNode,
    pub generated_at: DateTime<Local>,
}

impl Digest {
    /// Classified entries sorted by relative path.
    pub fn sorted_contents(&self) -> Vec<(&str, &ClassifiedEntry)> {
        let mut items: Vec<(&str, &ClassifiedEntry)> =
            self.contents.iter().map(|(k, v)| (k.as_str(), v)).collect();
        items.sort_by(|a, b| a.0.cmp(b.0));
        items
    }

    pub fn get(&self, path: &str) -> Option<&ClassifiedEntry> {
        self.contents.get(path)
    }

    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_file).count()
    }

    pub fn directory_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_file).count()
    }

    /// Tree render options carrying per-file markers and, if requested,
    /// size and line metadata.
    pub fn render_options(&self, with_metadata: bool) -> RenderOptions {
        let mut options = RenderOptions {
            show_size: with_metadata,
            show_lines: with_metadata,
            ..RenderOptions::default()
        };

        for classified in self.contents.values() {
            let path = classified.entry.relative_path.clone();
            if let Some(lines) = classified.line_count() {
                options.lines.insert(path.clone(), lines);
            }
            if let Some(marker) = marker_for(&classified.content) {
                options.markers.insert(path, marker);
            }
        }

        options
    }
}

fn marker_for(content: &Content) -> Option<Marker> {
    match content {
        Content::Text { .. } => None,
        Content::Truncated { .. } => Some(Marker::Truncated),
        Content::Redacted { .. } => Some(Marker::Redacted),
        Content::Binary { .. } => Some(Marker::Binary),
        Content::Database { .. } => Some(Marker::Database),
        Content::Error(_) => Some(Marker::Error),
    }
}

fn checked_root(root: &Path) -> Result<PathBuf, IngestError> {
    if !root.exists() {
        return Err(IngestError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(IngestError::NotADirectory(root.to_path_buf()));
    }
    Ok(root.canonicalize()?)
}

fn walk_error(e: WalkError) -> IngestError {
    match e {
        WalkError::NotFound { path } => IngestError::PathNotFound(path),
        WalkError::NotADirectory { path } => IngestError::NotADirectory(path),
        other => IngestError::Walk(other),
    }
}

/// Configured name, unless empty or the legacy "Auto-detected"
/// placeholder, in which case the root directory name.
fn project_name(config: &Config, root: &Path) -> String {
    let configured = config.project.name.trim();
    if !configured.is_empty() && configured != "Auto-detected" {
        return configured.to_string();
    }
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

// ============================================================================
// Functional API
// ============================================================================

/// Digest `root` with `config`.
pub fn ingest(root: impl AsRef<Path>, config: &Config) -> Result<Digest, IngestError> {
    Ingest::new(root.as_ref()).config(config.clone()).build()
}

/// Build the project tree for `root` with `config`.
pub fn tree_from_path(root: impl AsRef<Path>, config: &Config) -> Result<FileNode, IngestError> {
    Ingest::new(root.as_ref()).config(config.clone()).tree()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub fn lib() {}\n").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x\n").unwrap();
        fs::write(dir.path().join(".env"), "TOKEN=1\n").unwrap();
        fs::write(dir.path().join("debug.log"), "noise\n").unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        dir
    }

    #[test]
    fn test_build() {
        let dir = create_test_project();
        let digest = Ingest::new(dir.path()).build().unwrap();

        assert!(digest.get("src/main.rs").is_some());
        assert!(digest.get(".env").unwrap().is_redacted());
        assert!(digest.get("debug.log").is_none());
        assert!(digest.get("node_modules/pkg/index.js").is_none());
        assert_eq!(digest.stats.ignored, 1);
        assert_eq!(digest.stats.excluded_directory, 1);

        // Denylisted directories are left out of the tree entirely.
        assert!(digest.entries.iter().all(|e| !e.relative_str().starts_with("node_modules")));
        assert!(digest.tree.file_count() >= 3);
    }

    #[test]
    fn test_sorted_contents() {
        let dir = create_test_project();
        let digest = Ingest::new(dir.path()).build().unwrap();
        let paths: Vec<&str> = digest.sorted_contents().into_iter().map(|(p, _)| p).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_project_name() {
        let dir = create_test_project();
        let digest = Ingest::new(dir.path()).build().unwrap();
        assert_eq!(
            digest.project_name,
            dir.path().canonicalize().unwrap().file_name().unwrap().to_string_lossy()
        );

        let named = Ingest::new(dir.path()).project_name("demo").build().unwrap();
        assert_eq!(named.project_name, "demo");
        assert_eq!(named.tree.name, "demo");
    }

    #[test]
    fn test_hidden_files_can_be_skipped() {
        let dir = create_test_project();
        let digest = Ingest::new(dir.path()).include_hidden(false).build().unwrap();
        assert!(digest.get(".env").is_none());
    }

    #[test]
    fn test_render_options_carry_markers() {
        let dir = create_test_project();
        let digest = Ingest::new(dir.path()).build().unwrap();
        let options = digest.render_options(true);
        assert_eq!(options.markers.get(Path::new(".env")), Some(&Marker::Redacted));
        assert_eq!(options.lines.get(Path::new("src/main.rs")), Some(&1));
    }

    #[test]
    fn test_tree_only() {
        let dir = create_test_project();
        let tree = tree_from_path(dir.path(), &Config::default()).unwrap();
        assert!(tree.is_directory());
        assert_eq!(tree.file_count(), 4); // main.rs, lib.rs, .env, .gitignore
    }

    #[test]
    fn test_missing_root() {
        let err = ingest("/nonexistent/project", &Config::default()).unwrap_err();
        assert!(matches!(err, IngestError::PathNotFound(_)));
    }

    #[test]
    fn test_file_root() {
        let dir = create_test_project();
        let err = ingest(dir.path().join("src/main.rs"), &Config::default()).unwrap_err();
        assert!(matches!(err, IngestError::NotADirectory(_)));
    }
}
