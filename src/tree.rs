//! Project tree representation and rendering.
//!
//! The tree is built from discovered entries after filtering, so it shows
//! what the digest saw rather than what is on disk. Rendering uses
//! box-drawing characters and can tag files with their classification.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::walker::DiscoveredEntry;

/// The type of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File { extension: Option<String>, size: u64 },
}

/// A node in the project tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Final path component.
    pub name: String,
    /// Path relative to the project root (empty for the root).
    pub path: PathBuf,
    pub kind: NodeKind,
    children: Vec<FileNode>,
}

impl FileNode {
    pub fn directory(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Directory,
            children: Vec::new(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        extension: Option<String>,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File { extension, size },
            children: Vec::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory()
    }

    pub fn children(&self) -> &[FileNode] {
        &self.children
    }

    pub fn size(&self) -> Option<u64> {
        match &self.kind {
            NodeKind::File { size, .. } => Some(*size),
            NodeKind::Directory => None,
        }
    }

    /// Sort recursively: directories first, then case-insensitively by name.
    pub fn sort_children(&mut self) {
        self.children.sort_by(|a, b| match (a.is_directory(), b.is_directory()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });
        for child in &mut self.children {
            child.sort_children();
        }
    }

    pub fn file_count(&self) -> usize {
        match &self.kind {
            NodeKind::File { .. } => 1,
            NodeKind::Directory => self.children.iter().map(FileNode::file_count).sum(),
        }
    }

    /// Directories below this node, not counting the node itself.
    pub fn directory_count(&self) -> usize {
        self.children
            .iter()
            .filter(|c| c.is_directory())
            .map(|c| 1 + c.directory_count())
            .sum()
    }

    /// Insert `entry` at its relative path, creating missing parents.
    fn insert(&mut self, parts: &[&str], entry: &DiscoveredEntry) {
        let Some((first, rest)) = parts.split_first() else {
            return;
        };
        let child_path = self.path.join(first);

        let position = self.children.iter().position(|c| c.name == *first);
        if rest.is_empty() {
            match position {
                // A directory may have been created implicitly by a deeper
                // entry; keep it and its children.
                Some(_) if !entry.is_file => {}
                Some(i) => {
                    self.children[i] = FileNode::file(
                        *first,
                        child_path,
                        entry.extension.clone(),
                        entry.size,
                    )
                }
                None if entry.is_file => self.children.push(FileNode::file(
                    *first,
                    child_path,
                    entry.extension.clone(),
                    entry.size,
                )),
                None => self.children.push(FileNode::directory(*first, child_path)),
            }
            return;
        }

        let index = match position {
            Some(i) if self.children[i].is_directory() => i,
            Some(i) => {
                self.children[i] = FileNode::directory(*first, child_path);
                i
            }
            None => {
                self.children.push(FileNode::directory(*first, child_path));
                self.children.len() - 1
            }
        };
        self.children[index].insert(rest, entry);
    }
}

/// Build a sorted tree rooted at `root_name` from discovered entries.
///
/// Entries nested more than `max_depth` directories below the root are left
/// out. Parents that are missing from `entries` (for example a directory
/// dropped by an ignore rule whose child was re-included) are created.
pub fn build_tree(root_name: &str, entries: &[DiscoveredEntry], max_depth: usize) -> FileNode {
    let mut root = FileNode::directory(root_name, PathBuf::new());

    for entry in entries {
        let parts = path_parts(&entry.relative_path);
        if parts.is_empty() || parts.len() > max_depth + 1 {
            continue;
        }
        root.insert(&parts, entry);
    }

    root.sort_children();
    root
}

fn path_parts(path: &Path) -> Vec<&str> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect()
}

/// Classification tag shown next to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Redacted,
    Binary,
    Database,
    Truncated,
    Error,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Marker::Redacted => "redacted",
            Marker::Binary => "binary",
            Marker::Database => "database",
            Marker::Truncated => "truncated",
            Marker::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Options for rendering the tree.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub show_size: bool,
    pub show_lines: bool,
    /// Line counts keyed by relative path.
    pub lines: HashMap<PathBuf, usize>,
    /// Classification tags keyed by relative path.
    pub markers: HashMap<PathBuf, Marker>,
}

impl RenderOptions {
    pub fn minimal() -> Self {
        Self::default()
    }
}

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

/// Render a tree with box-drawing characters.
///
/// # Examples
///
/// ```
/// use gitingest::tree::{FileNode, RenderOptions, render_tree};
///
/// let root = FileNode::directory("project", "");
/// let output = render_tree(&root, &RenderOptions::minimal());
/// assert_eq!(output, "project/\n");
/// ```
pub fn render_tree(root: &FileNode, options: &RenderOptions) -> String {
    let mut output = String::with_capacity(4096);
    output.push_str(&root.name);
    output.push_str("/\n");
    render_children(&mut output, root, "", options);
    output
}

fn render_children(output: &mut String, node: &FileNode, prefix: &str, options: &RenderOptions) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let is_last = i + 1 == count;
        output.push_str(prefix);
        output.push_str(if is_last { LAST_BRANCH } else { BRANCH });
        output.push_str(&child.name);

        if child.is_directory() {
            output.push_str("/\n");
            let continuation = if is_last { SPACE } else { VERTICAL };
            render_children(output, child, &format!("{prefix}{continuation}"), options);
            continue;
        }

        let mut metadata = Vec::new();
        if options.show_lines {
            if let Some(lines) = options.lines.get(&child.path) {
                metadata.push(format!("{lines} lines"));
            }
        }
        if options.show_size {
            if let Some(size) = child.size() {
                metadata.push(format_size(size));
            }
        }
        if !metadata.is_empty() {
            output.push_str(" (");
            output.push_str(&metadata.join(", "));
            output.push(')');
        }

        if let Some(marker) = options.markers.get(&child.path) {
            output.push_str(&format!(" [{marker}]"));
        }

        output.push('\n');
    }
}

/// Human-readable size with one decimal above a kilobyte.
///
/// # Examples
///
/// ```
/// use gitingest::tree::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Format number with thousands separators.
pub fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
