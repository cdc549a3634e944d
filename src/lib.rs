//! gitingest - Turn a project directory into a single digest for LLMs.
//!
//! gitingest walks a project, drops what the ignore files and exclusion
//! policy say to drop, redacts files that look like they hold secrets, and
//! classifies everything else as text, binary or database before rendering
//! one Markdown or JSON document.
//!
//! # Quick Start
//!
//! ```no_run
//! use gitingest::builder::Ingest;
//! use gitingest::config::Config;
//! use gitingest::output::{format_output, OutputOptions};
//!
//! let config = Config::load(None);
//! let digest = Ingest::new("./my-project").config(config.clone()).build().unwrap();
//!
//! println!("{} files classified", digest.contents.len());
//! let text = format_output(&digest, &OutputOptions::from(&config)).unwrap();
//! print!("{text}");
//! ```
//!
//! # Modules
//!
//! - [`walker`] - Directory traversal
//! - [`filter`] - Ignore-file rules and the exclusion policy
//! - [`sensitive`] - Secret-looking file detection
//! - [`encoding`] - Encoding detection and decoding
//! - [`database`] - Database file summaries
//! - [`classify`] - The per-file classification pipeline
//! - [`tree`] - Project tree building and rendering
//! - [`output`] - Markdown and JSON rendering
//! - [`builder`] - Fluent API tying it together

pub mod builder;
pub mod classify;
pub mod config;
pub mod database;
pub mod encoding;
pub mod errors;
pub mod filter;
pub mod language;
pub mod output;
pub mod sensitive;
pub mod tokens;
pub mod tree;
pub mod walker;

// Re-export key types at crate root for convenience
pub use builder::{Digest, Ingest};
pub use classify::{ClassifiedEntry, Content, Pipeline, RunStats};
pub use config::{Config, ConfigError};
pub use database::{DatabaseSummary, DbKind};
pub use errors::IngestError;
pub use filter::{Exclusion, FileFilter, IgnoreRuleSet};
pub use output::{OutputError, OutputFormat, OutputOptions};
pub use sensitive::{Sensitivity, SensitiveReason};
pub use tree::{FileNode, NodeKind, RenderOptions};
pub use walker::{DiscoveredEntry, WalkError};
