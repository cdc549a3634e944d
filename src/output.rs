//! Output formatting for gitingest.
//!
//! Renders a [`Digest`] as Markdown (for reading and pasting into an LLM)
//! or JSON (for programmatic access).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::Digest;
use crate::classify::{ClassifiedEntry, Content};
use crate::config::Config;
use crate::database::DatabaseSummary;
use crate::language::language_for;
use crate::tokens::{estimate_total, Tokenizer};
use crate::tree::{format_number, format_size, render_tree};

/// Errors that can occur during output formatting.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown document (default).
    #[default]
    Markdown,
    /// JSON for programmatic access.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}

/// Options controlling what to include in output.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Per-file size, encoding, line count and truncation flag.
    pub include_metadata: bool,
    /// Statistics section.
    pub include_file_stats: bool,
    /// Tokenizer for the estimate in the statistics; `None` skips it.
    pub tokenizer: Option<Tokenizer>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Markdown,
            include_metadata: true,
            include_file_stats: true,
            tokenizer: Some(Tokenizer::default()),
        }
    }
}

impl From<&Config> for OutputOptions {
    fn from(config: &Config) -> Self {
        Self {
            format: config.project.output_format,
            include_metadata: config.output.include_metadata,
            include_file_stats: config.output.include_file_stats,
            ..Self::default()
        }
    }
}

/// Largest file seen by the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargestFile {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionCount {
    pub extension: String,
    pub count: usize,
}

/// Project-level statistics shown at the top of the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestStats {
    pub total_files: usize,
    pub total_dirs: usize,
    pub processed_files: usize,
    pub content_files: usize,
    pub binary_files: usize,
    pub sensitive_files: usize,
    pub error_files: usize,
    pub total_size: u64,
    pub largest_file: Option<LargestFile>,
    /// Up to ten extensions, most common first.
    pub most_common_extensions: Vec<ExtensionCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<usize>,
}

/// Number of extensions listed in the statistics.
const TOP_EXTENSIONS: usize = 10;

/// Gather statistics for `digest`, optionally with a token estimate over
/// every renderable text body.
pub fn collect_stats(digest: &Digest, tokenizer: Option<Tokenizer>) -> DigestStats {
    let files = || digest.entries.iter().filter(|e| e.is_file);
    let classified = || digest.contents.values();

    let largest_file = files()
        .filter(|e| e.size > 0)
        .max_by(|a, b| a.size.cmp(&b.size).then_with(|| b.relative_path.cmp(&a.relative_path)))
        .map(|e| LargestFile {
            name: e.relative_str(),
            size: e.size,
        });

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in files() {
        if let Some(ext) = entry.extension.as_deref() {
            *counts.entry(ext).or_default() += 1;
        }
    }
    let mut most_common_extensions: Vec<ExtensionCount> = counts
        .into_iter()
        .map(|(extension, count)| ExtensionCount {
            extension: extension.to_string(),
            count,
        })
        .collect();
    most_common_extensions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.extension.cmp(&b.extension)));
    most_common_extensions.truncate(TOP_EXTENSIONS);

    let estimated_tokens = tokenizer.map(|tokenizer| {
        let bodies: Vec<&str> = classified()
            .filter(|c| !c.is_binary())
            .filter_map(ClassifiedEntry::body)
            .collect();
        estimate_total(&bodies, tokenizer)
    });

    DigestStats {
        total_files: digest.file_count(),
        total_dirs: digest.directory_count(),
        processed_files: digest.contents.len(),
        content_files: classified().filter(|c| c.encoding().is_some()).count(),
        binary_files: classified().filter(|c| c.is_binary()).count(),
        sensitive_files: classified().filter(|c| c.is_redacted()).count(),
        error_files: classified().filter(|c| c.error().is_some()).count(),
        total_size: files().map(|e| e.size).sum(),
        largest_file,
        most_common_extensions,
        estimated_tokens,
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Render `digest` in the requested format.
pub fn format_output(digest: &Digest, options: &OutputOptions) -> Result<String, OutputError> {
    let stats = collect_stats(digest, options.tokenizer);
    match options.format {
        OutputFormat::Markdown => Ok(format_markdown(digest, &stats, options)),
        OutputFormat::Json => format_json(digest, &stats, options),
    }
}

/// Write rendered output to `path`.
pub fn write_output(path: &Path, rendered: &str) -> Result<(), OutputError> {
    std::fs::write(path, rendered).map_err(|source| OutputError::Write {
        path: path.display().to_string(),
        source,
    })
}

// ============================================================================
// Markdown Formatting
// ============================================================================

fn format_markdown(digest: &Digest, stats: &DigestStats, options: &OutputOptions) -> String {
    let mut output = String::with_capacity(16 * 1024);

    output.push_str(&format!("# Project Summary: {}\n\n", digest.project_name));
    output.push_str(&format!(
        "**Generated:** {}\n",
        digest.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("**Root:** {}\n\n", digest.root.display()));

    if options.include_file_stats {
        push_stats_markdown(&mut output, stats);
    }

    output.push_str("## 1. File Structure\n\n```\n");
    output.push_str(&render_tree(&digest.tree, &digest.render_options(options.include_metadata)));
    output.push_str("```\n\n");

    output.push_str("## 2. File Contents\n\n");
    for (path, classified) in digest.sorted_contents() {
        push_entry_markdown(&mut output, path, classified, options);
    }

    output.push_str("---\n*Generated by gitingest*\n");
    output
}

fn push_stats_markdown(output: &mut String, stats: &DigestStats) {
    output.push_str("## Statistics\n\n");
    output.push_str(&format!("- **Total files:** {}\n", format_number(stats.total_files)));
    output.push_str(&format!("- **Total directories:** {}\n", format_number(stats.total_dirs)));
    output.push_str(&format!("- **Processed files:** {}\n", format_number(stats.processed_files)));
    output.push_str(&format!("- **Files with content:** {}\n", format_number(stats.content_files)));
    output.push_str(&format!("- **Binary files:** {}\n", format_number(stats.binary_files)));
    output.push_str(&format!("- **Sensitive files:** {}\n", format_number(stats.sensitive_files)));
    output.push_str(&format!("- **Files with errors:** {}\n", format_number(stats.error_files)));
    output.push_str(&format!("- **Total size:** {}\n", format_size(stats.total_size)));

    if let Some(largest) = &stats.largest_file {
        output.push_str(&format!(
            "- **Largest file:** {} ({})\n",
            largest.name,
            format_size(largest.size)
        ));
    }

    if let Some(tokens) = stats.estimated_tokens {
        output.push_str(&format!("- **Estimated tokens:** {}\n", format_number(tokens)));
    }

    if !stats.most_common_extensions.is_empty() {
        output.push_str("\n### Most Common Extensions\n\n");
        for ext in &stats.most_common_extensions {
            output.push_str(&format!("- **.{}:** {}\n", ext.extension, ext.count));
        }
    }

    output.push('\n');
}

fn push_entry_markdown(output: &mut String, path: &str, classified: &ClassifiedEntry, options: &OutputOptions) {
    output.push_str(&format!("### [{path}]\n"));

    if options.include_metadata {
        let mut metadata = vec![format!("**Size:** {}", format_size(classified.entry.size))];
        if let Some(encoding) = classified.encoding() {
            metadata.push(format!("**Encoding:** {encoding}"));
        }
        if let Some(lines) = classified.line_count().filter(|&n| n > 0) {
            metadata.push(format!("**Lines:** {}", format_number(lines)));
        }
        if classified.is_truncated() {
            metadata.push("**Truncated:** yes".to_string());
        }
        output.push_str(&metadata.join(" | "));
        output.push('\n');
    }
    output.push('\n');

    match &classified.content {
        Content::Redacted { reason } => {
            output.push_str(&format!("**Sensitive content ({reason})** - contents withheld\n\n"));
        }
        Content::Error(message) => {
            output.push_str(&format!("**Error:** {message}\n\n"));
        }
        Content::Binary { note } => {
            if let Some(note) = note {
                output.push_str(note);
                output.push_str("\n\n");
            }
        }
        Content::Database { description, .. } => {
            output.push_str("```\n");
            output.push_str(description);
            output.push_str("\n```\n\n");
        }
        Content::Text { body, .. } | Content::Truncated { body, .. } => {
            let entry = &classified.entry;
            let language = language_for(entry.extension.as_deref(), &entry.name);
            let fence = fence_for(body);
            output.push_str(&format!("{fence}{language}\n"));
            output.push_str(body);
            if !body.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&fence);
            output.push_str("\n\n");
        }
    }
}

/// A backtick fence longer than any backtick run inside `body`.
fn fence_for(body: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in body.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

// ============================================================================
// JSON Formatting
// ============================================================================

#[derive(Serialize)]
struct JsonOutput<'a> {
    project: JsonProject<'a>,
    stats: &'a DigestStats,
    file_tree: String,
    files: BTreeMap<&'a str, JsonFile<'a>>,
}

#[derive(Serialize)]
struct JsonProject<'a> {
    name: &'a str,
    root_path: String,
    generated_at: String,
    generator: &'static str,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: &'a str,
    size: u64,
    extension: Option<&'a str>,
    modified_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<JsonMetadata<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    binary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a DatabaseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redacted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_count: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
}

fn format_json(digest: &Digest, stats: &DigestStats, options: &OutputOptions) -> Result<String, OutputError> {
    let files = digest
        .contents
        .iter()
        .map(|(path, classified)| (path.as_str(), file_to_json(path, classified, options)))
        .collect();

    let output = JsonOutput {
        project: JsonProject {
            name: &digest.project_name,
            root_path: digest.root.display().to_string(),
            generated_at: digest.generated_at.to_rfc3339(),
            generator: "gitingest",
        },
        stats,
        file_tree: render_tree(&digest.tree, &digest.render_options(options.include_metadata)),
        files,
    };

    Ok(serde_json::to_string_pretty(&output)?)
}

fn file_to_json<'a>(path: &'a str, classified: &'a ClassifiedEntry, options: &OutputOptions) -> JsonFile<'a> {
    let entry = &classified.entry;
    let mut file = JsonFile {
        path,
        size: entry.size,
        extension: entry.extension.as_deref(),
        modified_time: entry.modified_secs(),
        metadata: options.include_metadata.then(|| JsonMetadata {
            encoding: classified.encoding(),
            line_count: classified.line_count().filter(|&n| n > 0),
            truncated: classified.is_truncated(),
        }),
        content: None,
        language: None,
        binary: false,
        info: None,
        database: None,
        redacted: None,
        error: None,
    };

    match &classified.content {
        Content::Text { body, .. } | Content::Truncated { body, .. } => {
            file.content = Some(body);
            file.language = Some(language_for(entry.extension.as_deref(), &entry.name));
        }
        Content::Binary { note } => {
            file.binary = true;
            file.info = note.as_deref();
        }
        Content::Database { summary, description } => {
            file.binary = true;
            file.info = Some(description);
            file.database = Some(summary);
        }
        Content::Redacted { reason } => file.redacted = Some(reason.to_string()),
        Content::Error(message) => file.error = Some(message),
    }

    file
}
