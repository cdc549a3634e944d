//! Sensitive-file detection.
//!
//! A file is sensitive when its name contains one of the configured tokens
//! or when its first [`SCAN_LINES`] lines match one of the configured
//! regexes. Sensitive files stay in the digest as redaction markers; their
//! bytes are never rendered.
//!
//! The content scan fails open: if the file cannot be read the entry is
//! treated as clean. A transient read error therefore skips the check for
//! that file; the error is logged at debug level.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::filter::is_text_like;
use crate::walker::DiscoveredEntry;

/// Number of leading lines scanned for sensitive content.
pub const SCAN_LINES: usize = 50;

/// Upper bound on bytes read by the content scan, whatever the line count.
pub const SCAN_BYTES: u64 = 1024 * 1024;

/// Why an entry was flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensitiveReason {
    /// The file name contains a sensitive token.
    Filename,
    /// Leading content matched the pattern with this source text.
    Content(String),
}

impl SensitiveReason {
    pub fn is_filename(&self) -> bool {
        matches!(self, SensitiveReason::Filename)
    }
}

impl fmt::Display for SensitiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensitiveReason::Filename => write!(f, "filename"),
            SensitiveReason::Content(pattern) => write!(f, "{pattern}"),
        }
    }
}

/// Outcome of [`SensitivityClassifier::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sensitivity {
    Clean,
    Sensitive(SensitiveReason),
}

impl Sensitivity {
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Sensitivity::Sensitive(_))
    }

    pub fn reason(&self) -> Option<&SensitiveReason> {
        match self {
            Sensitivity::Clean => None,
            Sensitivity::Sensitive(reason) => Some(reason),
        }
    }
}

/// Compiled name tokens and content patterns.
#[derive(Debug, Clone)]
pub struct SensitivityClassifier {
    name_tokens: Vec<String>,
    content_patterns: Vec<Regex>,
}

impl SensitivityClassifier {
    /// Compile the configured patterns. Invalid regexes are logged and
    /// skipped; the remaining ones stay active.
    pub fn new(config: &FilterConfig) -> Self {
        let name_tokens = config
            .sensitive_patterns
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        let content_patterns = config
            .sensitive_content_patterns
            .iter()
            .filter_map(|source| {
                match RegexBuilder::new(source).case_insensitive(true).build() {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!("skipping invalid sensitive content pattern {source:?}: {e}");
                        None
                    }
                }
            })
            .collect();

        Self {
            name_tokens,
            content_patterns,
        }
    }

    /// Number of content patterns that compiled.
    pub fn content_pattern_count(&self) -> usize {
        self.content_patterns.len()
    }

    /// Name check first, then (for text-like files only) the content check.
    pub fn classify(&self, entry: &DiscoveredEntry) -> Sensitivity {
        if self.name_is_sensitive(&entry.name) {
            return Sensitivity::Sensitive(SensitiveReason::Filename);
        }

        if !is_text_like(entry) {
            return Sensitivity::Clean;
        }

        match self.scan_content(&entry.path) {
            Some(pattern) => Sensitivity::Sensitive(SensitiveReason::Content(pattern)),
            None => Sensitivity::Clean,
        }
    }

    /// Case-insensitive substring match against the base name.
    pub fn name_is_sensitive(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.name_tokens.iter().any(|token| lower.contains(token))
    }

    /// Source of the first pattern that matches `text`.
    pub fn match_content(&self, text: &str) -> Option<String> {
        self.content_patterns
            .iter()
            .find(|re| re.is_match(text))
            .map(|re| re.as_str().to_string())
    }

    fn scan_content(&self, path: &Path) -> Option<String> {
        if self.content_patterns.is_empty() {
            return None;
        }

        match read_leading_lines(path, SCAN_LINES, SCAN_BYTES) {
            Ok(text) => self.match_content(&text),
            Err(e) => {
                debug!("content scan skipped for {}: {e}", path.display());
                None
            }
        }
    }
}

/// Read at most `max_lines` lines, and never more than `max_bytes` bytes,
/// without loading the rest of the file. Invalid UTF-8 sequences are
/// dropped so that a stray byte cannot split a secret.
fn read_leading_lines(path: &Path, max_lines: usize, max_bytes: u64) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?.take(max_bytes));
    let mut buf = Vec::new();

    for _ in 0..max_lines {
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
    }

    Ok(buf.utf8_chunks().map(|chunk| chunk.valid()).collect())
}
