//! Content classification pipeline.
//!
//! Every discovered file passes through the same stages, and the first stage
//! that claims it decides its fate:
//!
//! 1. ignore-file rules (dropped silently)
//! 2. policy exclusion (dropped silently)
//! 3. sensitivity check (kept as a redaction marker)
//! 4. existence and hard size cap (kept as an error)
//! 5. database detection (kept as a metadata summary)
//! 6. decode, falling back to binary
//! 7. line-cap truncation
//!
//! Files are classified independently and in parallel; counters are folded
//! afterwards so the result does not depend on scheduling.

use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::{detect_kind, summarize, DatabaseSummary, DbKind, SummarizeOptions};
use crate::encoding::EncodingResolver;
use crate::filter::{Exclusion, FileFilter, IgnoreRuleSet};
use crate::sensitive::{SensitiveReason, Sensitivity, SensitivityClassifier};
use crate::walker::DiscoveredEntry;

/// Files larger than this are never read, whatever the configured ceiling.
pub const HARD_SIZE_CAP: u64 = 10 * 1024 * 1024;

const TRUNCATION_PREFIX: &str = "\n\n[... Content truncated from ";
const TRUNCATION_SUFFIX: &str = " lines ...]";

/// Terminal classification of a file that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Full decoded text.
    Text {
        body: String,
        encoding: String,
        lines: usize,
    },
    /// Decoded text cut to the line cap, with the truncation marker appended.
    Truncated {
        body: String,
        encoding: String,
        total_lines: usize,
        kept_lines: usize,
    },
    /// Sensitive file; the body is never read into the digest.
    Redacted { reason: SensitiveReason },
    /// Undecodable bytes. `note` is absent when binary info is disabled.
    Binary { note: Option<String> },
    /// Recognized database file, described by metadata only.
    Database {
        summary: DatabaseSummary,
        description: String,
    },
    /// Recoverable per-file failure.
    Error(String),
}

impl Content {
    /// Short name of the variant, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text { .. } => "text",
            Content::Truncated { .. } => "truncated",
            Content::Redacted { .. } => "redacted",
            Content::Binary { .. } => "binary",
            Content::Database { .. } => "database",
            Content::Error(_) => "error",
        }
    }
}

/// A discovered file together with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEntry {
    pub entry: DiscoveredEntry,
    pub content: Content,
}

impl ClassifiedEntry {
    /// Renderable body: decoded text, binary note, or database description.
    /// Redacted and failed entries have none.
    pub fn body(&self) -> Option<&str> {
        match &self.content {
            Content::Text { body, .. } | Content::Truncated { body, .. } => Some(body),
            Content::Binary { note } => note.as_deref(),
            Content::Database { description, .. } => Some(description),
            Content::Redacted { .. } | Content::Error(_) => None,
        }
    }

    pub fn encoding(&self) -> Option<&str> {
        match &self.content {
            Content::Text { encoding, .. } | Content::Truncated { encoding, .. } => Some(encoding),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.content {
            Content::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn redaction(&self) -> Option<&SensitiveReason> {
        match &self.content {
            Content::Redacted { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self.content, Content::Redacted { .. })
    }

    /// Binary and database entries both count as binary.
    pub fn is_binary(&self) -> bool {
        matches!(self.content, Content::Binary { .. } | Content::Database { .. })
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self.content, Content::Truncated { .. })
    }

    pub fn database(&self) -> Option<&DatabaseSummary> {
        match &self.content {
            Content::Database { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// Line count of the original text (before truncation).
    pub fn line_count(&self) -> Option<usize> {
        match &self.content {
            Content::Text { lines, .. } => Some(*lines),
            Content::Truncated { total_lines, .. } => Some(*total_lines),
            _ => None,
        }
    }
}

/// Result of cutting a body to a line cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub body: String,
    pub total_lines: usize,
    pub kept_lines: usize,
}

/// Cut `text` to its first `max_lines` lines and append the truncation
/// marker. Returns `None` when the text already fits, including text that
/// was truncated before and still fits the cap. A cap of 0 disables
/// truncation.
///
/// # Examples
///
/// ```
/// use gitingest::classify::truncate_lines;
///
/// let cut = truncate_lines("a\nb\nc\n", 2).unwrap();
/// assert_eq!(cut.body, "a\nb\n\n[... Content truncated from 3 to 2 lines ...]");
/// assert!(truncate_lines(&cut.body, 2).is_none());
/// ```
pub fn truncate_lines(text: &str, max_lines: usize) -> Option<Truncation> {
    if max_lines == 0 {
        return None;
    }

    let (body, marked_total) = match split_marker(text) {
        Some((body, total)) => (body, Some(total)),
        None => (text, None),
    };

    // Fewer newlines than the cap means at most `max_lines` lines.
    if bytecount::count(body.as_bytes(), b'\n') < max_lines {
        return None;
    }

    let line_count = body.lines().count();
    if line_count <= max_lines {
        return None;
    }

    let kept: Vec<&str> = body.lines().take(max_lines).collect();
    let total_lines = marked_total.unwrap_or(line_count);
    Some(Truncation {
        body: format!(
            "{}{TRUNCATION_PREFIX}{total_lines} to {max_lines}{TRUNCATION_SUFFIX}",
            kept.join("\n")
        ),
        total_lines,
        kept_lines: max_lines,
    })
}

/// Split a previously truncated body into its kept text and original total.
///
/// The trailing marker is only trusted when it is consistent with the text
/// in front of it: the kept count equals that text's line count and the
/// total is larger. Anything else is file content that happens to look
/// like a marker.
fn split_marker(text: &str) -> Option<(&str, usize)> {
    let start = text.rfind(TRUNCATION_PREFIX)?;
    let counts = text[start + TRUNCATION_PREFIX.len()..].strip_suffix(TRUNCATION_SUFFIX)?;
    let (total, kept) = counts.split_once(" to ")?;
    let total: usize = total.parse().ok()?;
    let kept: usize = kept.parse().ok()?;

    let body = &text[..start];
    if kept != body.lines().count() || total <= kept {
        return None;
    }
    Some((body, total))
}

/// Pipeline switches derived from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_content_lines: usize,
    pub include_binary_info: bool,
    pub analyze_databases: bool,
    pub extract_schema: bool,
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_content_lines: config.output.max_content_lines,
            include_binary_info: config.output.include_binary_info,
            analyze_databases: config.database.enabled,
            extract_schema: config.database.extract_schema,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Files handed to the pipeline.
    pub considered: usize,
    pub ignored: usize,
    pub excluded_directory: usize,
    pub excluded_extension: usize,
    pub excluded_size: usize,
    pub redacted_by_name: usize,
    pub redacted_by_content: usize,
    /// Files decoded as text, truncated or not.
    pub decoded: usize,
    pub truncated: usize,
    pub binary: usize,
    pub databases: usize,
    pub errors: usize,
}

impl RunStats {
    /// Files that produced a classified entry.
    pub fn processed(&self) -> usize {
        self.redacted() + self.decoded + self.binary + self.databases + self.errors
    }

    pub fn redacted(&self) -> usize {
        self.redacted_by_name + self.redacted_by_content
    }

    pub fn excluded(&self) -> usize {
        self.excluded_directory + self.excluded_extension + self.excluded_size
    }

    fn record_exclusion(&mut self, exclusion: Exclusion) {
        match exclusion {
            Exclusion::Directory => self.excluded_directory += 1,
            Exclusion::Extension => self.excluded_extension += 1,
            Exclusion::Size => self.excluded_size += 1,
        }
    }

    fn record(&mut self, content: &Content) {
        match content {
            Content::Text { .. } => self.decoded += 1,
            Content::Truncated { .. } => {
                self.decoded += 1;
                self.truncated += 1;
            }
            Content::Redacted { reason } if reason.is_filename() => self.redacted_by_name += 1,
            Content::Redacted { .. } => self.redacted_by_content += 1,
            Content::Binary { .. } => self.binary += 1,
            Content::Database { .. } => self.databases += 1,
            Content::Error(_) => self.errors += 1,
        }
    }
}

/// What the pipeline decided for one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Dropped by an ignore-file rule.
    Ignored,
    /// Dropped by policy.
    Excluded(Exclusion),
    /// Kept, with its classification.
    Classified(Content),
}

/// Everything one run produces.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Entries (files and directories) that survived the ignore-file stage,
    /// in input order.
    pub entries: Vec<DiscoveredEntry>,
    /// Classified files keyed by `/`-separated relative path.
    pub contents: HashMap<String, ClassifiedEntry>,
    pub stats: RunStats,
}

/// The classification pipeline for one scan.
#[derive(Debug)]
pub struct Pipeline {
    rules: IgnoreRuleSet,
    filter: FileFilter,
    sensitivity: SensitivityClassifier,
    resolver: EncodingResolver,
    options: PipelineOptions,
}

impl Pipeline {
    /// Build a pipeline with no ignore-file rules and the default encoding
    /// detector.
    pub fn new(config: &Config) -> Self {
        Self {
            rules: IgnoreRuleSet::default(),
            filter: FileFilter::new(&config.filters),
            sensitivity: SensitivityClassifier::new(&config.filters),
            resolver: EncodingResolver::default(),
            options: PipelineOptions::from(config),
        }
    }

    /// Apply ignore-file rules before anything else.
    pub fn with_rules(mut self, rules: IgnoreRuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the encoding resolver.
    pub fn with_resolver(mut self, resolver: EncodingResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn is_ignored(&self, entry: &DiscoveredEntry) -> bool {
        self.rules.is_ignored(entry)
    }

    /// Classify every file in `entries`.
    pub fn run(&self, entries: Vec<DiscoveredEntry>) -> PipelineOutput {
        let verdicts: Vec<Option<Verdict>> = entries
            .par_iter()
            .map(|entry| {
                if self.is_ignored(entry) {
                    Some(Verdict::Ignored)
                } else if entry.is_file {
                    Some(self.evaluate(entry))
                } else {
                    None
                }
            })
            .collect();

        let mut output = PipelineOutput::default();
        for (entry, verdict) in entries.into_iter().zip(verdicts) {
            let Some(verdict) = verdict else {
                output.entries.push(entry);
                continue;
            };

            if !entry.is_file {
                continue;
            }

            output.stats.considered += 1;
            match verdict {
                Verdict::Ignored => output.stats.ignored += 1,
                Verdict::Excluded(exclusion) => {
                    output.stats.record_exclusion(exclusion);
                    output.entries.push(entry);
                }
                Verdict::Classified(content) => {
                    output.stats.record(&content);
                    output.entries.push(entry.clone());
                    output
                        .contents
                        .insert(entry.relative_str(), ClassifiedEntry { entry, content });
                }
            }
        }

        let stats = &output.stats;
        info!(
            considered = stats.considered,
            processed = stats.processed(),
            ignored = stats.ignored,
            excluded = stats.excluded(),
            redacted = stats.redacted(),
            binary = stats.binary,
            databases = stats.databases,
            errors = stats.errors,
            "classification finished"
        );

        output
    }

    /// Exclusion, then sensitivity, then content classification for one
    /// file. Ignore-file rules are not consulted.
    pub fn evaluate(&self, entry: &DiscoveredEntry) -> Verdict {
        let path = entry.relative_str();

        if let Some(exclusion) = self.filter.should_exclude(entry) {
            debug!("excluded by {exclusion}: {path}");
            return Verdict::Excluded(exclusion);
        }

        if let Sensitivity::Sensitive(reason) = self.sensitivity.classify(entry) {
            debug!("redacted ({reason}): {path}");
            return Verdict::Classified(Content::Redacted { reason });
        }

        let content = self.classify_content(entry);
        debug!("classified as {}: {path}", content.kind());
        Verdict::Classified(content)
    }

    /// Read and classify a file that is already known to be admissible.
    pub fn classify_content(&self, entry: &DiscoveredEntry) -> Content {
        let size = match std::fs::metadata(&entry.path) {
            Ok(metadata) => metadata.len(),
            Err(e) => return read_error(e),
        };

        if size > HARD_SIZE_CAP {
            return Content::Error(format!(
                "file too large ({size} bytes, limit {HARD_SIZE_CAP} bytes)"
            ));
        }

        if self.options.analyze_databases {
            if let Some(kind) = detect_kind(entry) {
                return self.summarize_database(entry, kind, size);
            }
        }

        let bytes = match read_capped(entry, size) {
            Ok(bytes) => bytes,
            Err(e) => return read_error(e),
        };

        let Some(decoded) = self.resolver.resolve_and_decode(&bytes) else {
            return Content::Binary {
                note: self
                    .options
                    .include_binary_info
                    .then(|| format!("[Binary file - {} bytes]", bytes.len())),
            };
        };

        match truncate_lines(&decoded.text, self.options.max_content_lines) {
            Some(cut) => Content::Truncated {
                body: cut.body,
                encoding: decoded.encoding,
                total_lines: cut.total_lines,
                kept_lines: cut.kept_lines,
            },
            None => Content::Text {
                lines: decoded.text.lines().count(),
                body: decoded.text,
                encoding: decoded.encoding,
            },
        }
    }

    /// Describe `entry` as a database of `kind`, regardless of its
    /// extension.
    pub fn summarize_database(&self, entry: &DiscoveredEntry, kind: DbKind, size: u64) -> Content {
        let options = SummarizeOptions {
            extract_schema: self.options.extract_schema,
        };
        let summary = summarize(entry, kind, options);
        let description = summary.describe(size);
        Content::Database {
            summary,
            description,
        }
    }
}

/// Read the whole file, but never more than the hard cap even if the file
/// grew after it was measured. `size` is the freshly stat-ed length.
fn read_capped(entry: &DiscoveredEntry, size: u64) -> std::io::Result<Vec<u8>> {
    let file = File::open(&entry.path)?;
    let mut bytes = Vec::with_capacity(size.min(HARD_SIZE_CAP) as usize);
    file.take(HARD_SIZE_CAP).read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_error(e: std::io::Error) -> Content {
    if e.kind() == ErrorKind::NotFound {
        Content::Error("file does not exist".to_string())
    } else {
        Content::Error(format!("error reading file: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{EncodingDetector, EncodingGuess};
    use crate::walker::{discover, WalkOptions};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct NoGuess;

    impl EncodingDetector for NoGuess {
        fn detect(&self, _bytes: &[u8]) -> Option<EncodingGuess> {
            None
        }
    }

    struct Guess(&'static str, f32);

    impl EncodingDetector for Guess {
        fn detect(&self, _bytes: &[u8]) -> Option<EncodingGuess> {
            Some(EncodingGuess {
                name: self.0.to_string(),
                confidence: self.1,
            })
        }
    }

    fn pipeline(config: &Config) -> Pipeline {
        Pipeline::new(config).with_resolver(EncodingResolver::new(Box::new(NoGuess)))
    }

    fn write(dir: &TempDir, relative: &str, content: &[u8]) -> DiscoveredEntry {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        DiscoveredEntry::from_path(dir.path(), &path).unwrap()
    }

    fn content_of(pipeline: &Pipeline, entry: &DiscoveredEntry) -> Content {
        match pipeline.evaluate(entry) {
            Verdict::Classified(content) => content,
            other => panic!("expected a classification, got {other:?}"),
        }
    }

    fn run_dir(pipeline: &Pipeline, root: &Path) -> PipelineOutput {
        let entries = discover(root, &WalkOptions::default(), &IgnoreRuleSet::default()).unwrap();
        pipeline.run(entries)
    }

    /// Deterministic pseudo-random bytes behind a PNG signature.
    fn png_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        let mut state: u32 = 0x2545_f491;
        while bytes.len() < len {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            bytes.push((state >> 24) as u8);
        }
        bytes
    }

    #[test]
    fn test_truncation_marker() {
        let text: String = (1..=10).map(|i| format!("line {i}\n")).collect();
        let cut = truncate_lines(&text, 3).unwrap();
        assert_eq!(
            cut.body,
            "line 1\nline 2\nline 3\n\n[... Content truncated from 10 to 3 lines ...]"
        );
        assert_eq!(cut.total_lines, 10);
        assert_eq!(cut.kept_lines, 3);
    }

    #[test]
    fn test_truncation_is_idempotent() {
        let text: String = (1..=10).map(|i| format!("{i}\n")).collect();
        let once = truncate_lines(&text, 4).unwrap();
        assert_eq!(truncate_lines(&once.body, 4), None);

        // Text that merely ends like a marker is truncated as fresh input.
        let lookalike = "1\n2\n3\n4\n5\n6\n7\n8\n9\n\n[... Content truncated from 3 to 1 lines ...]";
        let cut = truncate_lines(lookalike, 5).unwrap();
        assert_eq!(cut.total_lines, 11);
        assert_eq!(cut.kept_lines, 5);
        assert_eq!(cut.body, "1\n2\n3\n4\n5\n\n[... Content truncated from 11 to 5 lines ...]");
        assert!(cut.total_lines >= cut.kept_lines);
    }

    #[test]
    fn test_marker_with_inconsistent_counts_is_content() {
        // Kept count does not match the text in front of the marker.
        let text = "a\nb\n\n[... Content truncated from 50 to 7 lines ...]";
        assert_eq!(split_marker(text), None);
        // Total not larger than kept.
        let text = "a\nb\n\n[... Content truncated from 2 to 2 lines ...]";
        assert_eq!(split_marker(text), None);
        let text = "a\nb\n\n[... Content truncated from 9 to 2 lines ...]";
        assert_eq!(split_marker(text), Some(("a\nb", 9)));
    }

    #[test]
    fn test_retruncating_to_smaller_cap_keeps_original_total() {
        let text: String = (1..=10).map(|i| format!("{i}\n")).collect();
        let once = truncate_lines(&text, 6).unwrap();
        let twice = truncate_lines(&once.body, 2).unwrap();
        assert_eq!(twice.body, "1\n2\n\n[... Content truncated from 10 to 2 lines ...]");
    }

    #[test]
    fn test_no_truncation_at_or_below_cap() {
        assert_eq!(truncate_lines("a\nb\nc", 3), None);
        assert_eq!(truncate_lines("a\nb\nc\n", 3), None);
        assert_eq!(truncate_lines("a\nb\nc\nd", 0), None);
        assert_eq!(truncate_lines("", 1), None);
    }

    #[test]
    fn test_negation_wins_in_pipeline() {
        let dir = TempDir::new().unwrap();
        write(&dir, "debug.log", b"noise\n");
        write(&dir, "keep.log", b"signal\n");

        let output = run_dir(
            &pipeline(&Config::default()).with_rules(IgnoreRuleSet::parse("*.log\n!keep.log\n")),
            dir.path(),
        );

        assert!(output.contents.contains_key("keep.log"));
        assert!(!output.contents.contains_key("debug.log"));
        assert_eq!(output.stats.ignored, 1);
    }

    #[test]
    fn test_build_dir_with_negated_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "build/output.bin", &[0u8, 1, 2, 0xff]);
        write(&dir, "build/keep.txt", b"kept\n");

        let output = run_dir(
            &pipeline(&Config::default()).with_rules(IgnoreRuleSet::parse("build/\n!build/keep.txt\n")),
            dir.path(),
        );

        let paths: Vec<&str> = output.contents.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["build/keep.txt"]);
        assert!(output.entries.iter().all(|e| e.relative_str() != "build/output.bin"));
    }

    #[test]
    fn test_size_ceiling_is_strict() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.filters.max_file_size = 1;
        let p = pipeline(&config);

        let exact = write(&dir, "exact.txt", &[b'a'; 1024]);
        let over = write(&dir, "over.txt", &[b'a'; 1025]);

        assert!(matches!(p.evaluate(&exact), Verdict::Classified(Content::Text { .. })));
        assert_eq!(p.evaluate(&over), Verdict::Excluded(Exclusion::Size));
    }

    #[test]
    fn test_sensitive_names_are_redacted() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&Config::default());

        for name in ["Secret.env", "my_secret_key.txt"] {
            let entry = write(&dir, name, b"harmless\n");
            let content = content_of(&p, &entry);
            assert_eq!(
                content,
                Content::Redacted {
                    reason: SensitiveReason::Filename
                }
            );
        }
    }

    #[test]
    fn test_redacted_body_is_never_exposed() {
        let dir = TempDir::new().unwrap();
        write(&dir, "config.py", b"API_KEY = 'abcdefghijklmnop'\n");

        let output = run_dir(&pipeline(&Config::default()), dir.path());
        let entry = &output.contents["config.py"];

        assert!(entry.is_redacted());
        assert_eq!(entry.body(), None);
        assert_eq!(entry.encoding(), None);
        assert!(!format!("{:?}", entry.content).contains("abcdefghijklmnop"));
        assert_eq!(output.stats.redacted_by_content, 1);
    }

    #[test]
    fn test_text_with_db_extension_is_a_database() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "notes.db", "plain utf-8 text\n".as_bytes());

        let content = content_of(&pipeline(&Config::default()), &entry);
        let Content::Database { summary, description } = content else {
            panic!("expected a database summary");
        };
        assert_eq!(summary.kind, DbKind::Sqlite);
        assert_eq!(summary.table_count, None);
        assert!(description.starts_with("[Database file - sqlite]"));
    }

    #[test]
    fn test_database_analysis_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "notes.db", b"plain text\n");
        let mut config = Config::default();
        config.database.enabled = false;

        assert!(matches!(
            content_of(&pipeline(&config), &entry),
            Content::Text { .. }
        ));
    }

    #[test]
    fn test_low_confidence_guess_decodes_as_utf8() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "notes.txt", "résumé\n".as_bytes());
        let p = Pipeline::new(&Config::default())
            .with_resolver(EncodingResolver::new(Box::new(Guess("ISO-8859-1", 0.5))));

        let content = content_of(&p, &entry);
        assert_eq!(
            content,
            Content::Text {
                body: "résumé\n".to_string(),
                encoding: "utf-8".to_string(),
                lines: 1,
            }
        );
    }

    #[test]
    fn test_binary_note_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let entry = write(&dir, "blob.bin", &png_bytes(64));

        let mut config = Config::default();
        assert_eq!(
            content_of(&pipeline(&config), &entry),
            Content::Binary {
                note: Some("[Binary file - 64 bytes]".to_string())
            }
        );

        config.output.include_binary_info = false;
        assert_eq!(
            content_of(&pipeline(&config), &entry),
            Content::Binary { note: None }
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let p = pipeline(&Config::default());
        let entry = DiscoveredEntry {
            path: PathBuf::from("/nonexistent/gone.txt"),
            relative_path: PathBuf::from("gone.txt"),
            name: "gone.txt".to_string(),
            extension: Some("txt".to_string()),
            size: 3,
            is_file: true,
            is_hidden: false,
            modified: None,
        };

        let content = content_of(&p, &entry);
        assert_eq!(content, Content::Error("file does not exist".to_string()));
    }

    #[test]
    fn test_hard_size_cap_applies_above_configured_ceiling() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.filters.max_file_size = 20 * 1024;
        let p = pipeline(&config);

        let over = write(&dir, "over.txt", &vec![b'a'; HARD_SIZE_CAP as usize + 1]);
        match content_of(&p, &over) {
            Content::Error(message) => assert!(message.starts_with("file too large")),
            other => panic!("expected an error, got {}", other.kind()),
        }

        let at_cap = write(&dir, "at_cap.txt", &vec![b'a'; HARD_SIZE_CAP as usize]);
        let content = content_of(&p, &at_cap);
        assert!(!matches!(content, Content::Error(_)), "got {}", content.kind());
    }

    #[test]
    fn test_read_uses_fresh_size_not_discovered_size() {
        let dir = TempDir::new().unwrap();
        let mut entry = write(&dir, "shrunk.txt", b"short now\n");
        // Size recorded at discovery no longer matches the file.
        entry.size = u64::MAX;

        let bytes = read_capped(&entry, 10).unwrap();
        assert_eq!(bytes, b"short now\n");

        let content = pipeline(&Config::default()).classify_content(&entry);
        assert!(matches!(content, Content::Text { lines: 1, .. }));
    }

    #[test]
    fn test_long_file_is_truncated() {
        let dir = TempDir::new().unwrap();
        let text: String = (0..20).map(|i| format!("{i}\n")).collect();
        let entry = write(&dir, "long.txt", text.as_bytes());

        let mut config = Config::default();
        config.output.max_content_lines = 5;
        let classified = ClassifiedEntry {
            content: content_of(&pipeline(&config), &entry),
            entry,
        };

        assert!(classified.is_truncated());
        assert_eq!(classified.line_count(), Some(20));
        assert!(classified
            .body()
            .unwrap()
            .ends_with("[... Content truncated from 20 to 5 lines ...]"));
    }

    #[test]
    fn test_every_file_lands_in_exactly_one_bucket() {
        let dir = TempDir::new().unwrap();
        write(&dir, "src/main.rs", b"fn main() {}\n");
        write(&dir, "node_modules/pkg/index.js", b"module.exports = 1;\n");
        write(&dir, "cache.pyc", b"\x00\x01");
        write(&dir, "password.txt", b"x\n");
        write(&dir, "logo.png", &png_bytes(300));
        write(&dir, "big.txt", &vec![b'a'; 300 * 1024]);

        let output = run_dir(&pipeline(&Config::default()), dir.path());
        let stats = output.stats;

        assert_eq!(stats.considered, 6);
        assert_eq!(stats.excluded_directory, 1);
        assert_eq!(stats.excluded_extension, 1);
        assert_eq!(stats.excluded_size, 1);
        assert_eq!(stats.redacted_by_name, 1);
        assert_eq!(stats.decoded, 1);
        assert_eq!(stats.binary, 1);
        assert_eq!(stats.considered, stats.ignored + stats.excluded() + stats.processed());
        assert_eq!(output.contents.len(), stats.processed());
    }

    #[test]
    fn test_end_to_end_project() {
        let dir = TempDir::new().unwrap();
        let app: String = (0..200).map(|i| format!("print({i})\n")).collect();
        write(&dir, "src/app.py", app.as_bytes());
        write(&dir, ".env", b"API_KEY=abc123\n");
        rusqlite::Connection::open(dir.path().join("data.sqlite"))
            .unwrap()
            .execute_batch("CREATE TABLE t (x); DROP TABLE t;")
            .unwrap();
        write(&dir, "image.png", &png_bytes(1200));

        let output = run_dir(&pipeline(&Config::default()), dir.path());
        assert_eq!(output.contents.len(), 4);

        let app_entry = &output.contents["src/app.py"];
        assert_eq!(app_entry.body(), Some(app.as_str()));
        assert_eq!(app_entry.line_count(), Some(200));

        assert_eq!(
            output.contents[".env"].redaction(),
            Some(&SensitiveReason::Filename)
        );

        let db = output.contents["data.sqlite"].database().unwrap();
        assert_eq!(db.table_count, Some(0));

        let image = &output.contents["image.png"];
        assert!(image.is_binary());
        assert_eq!(image.body(), Some("[Binary file - 1200 bytes]"));
    }
}
