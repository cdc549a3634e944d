//! gitingest CLI - Turn a project directory into a single LLM-ready digest.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use gitingest::builder::{tree_from_path, Ingest};
use gitingest::classify::{Content, Pipeline, Verdict};
use gitingest::config::Config;
use gitingest::database::probe_kind;
use gitingest::errors::{exit_code, IngestError};
use gitingest::output::{format_output, write_output, OutputFormat, OutputOptions};
use gitingest::tokens::Tokenizer;
use gitingest::tree::{render_tree, FileNode, NodeKind, RenderOptions};
use gitingest::walker::DiscoveredEntry;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gitingest")]
#[command(about = "Turn a project directory into a single LLM-ready digest")]
#[command(version)]
struct Cli {
    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the project digest
    Digest {
        /// Root directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (defaults to the configured output_file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long)]
        format: Option<FormatArg>,

        /// Print the digest instead of writing a file
        #[arg(long)]
        stdout: bool,

        /// Tokenizer for the token estimate
        #[arg(long, default_value = "cl100k")]
        tokenizer: TokenizerArg,

        /// Skip the token estimate
        #[arg(long)]
        no_tokens: bool,

        /// Report errors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display the filtered project tree
    Tree {
        /// Root directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Hide file sizes
        #[arg(long)]
        no_metadata: bool,

        /// Leave out hidden files and directories
        #[arg(long)]
        no_hidden: bool,

        /// Maximum directory depth
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Classify a single file
    Inspect {
        /// File to classify
        file: PathBuf,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Summarize as a database whatever the extension
        #[arg(long)]
        as_database: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the merged configuration as TOML
        #[arg(long)]
        show: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum FormatArg {
    Markdown,
    Json,
}

#[derive(Clone, ValueEnum)]
enum TokenizerArg {
    Cl100k,
    O200k,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

impl From<TokenizerArg> for Tokenizer {
    fn from(arg: TokenizerArg) -> Self {
        match arg {
            TokenizerArg::Cl100k => Tokenizer::Cl100k,
            TokenizerArg::O200k => Tokenizer::O200k,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let json_output = json_flag(&cli.command);

    let result = match cli.command {
        Commands::Digest {
            path,
            config,
            output,
            format,
            stdout,
            tokenizer,
            no_tokens,
            json: _,
        } => run_digest(DigestArgs {
            path,
            config,
            output,
            format: format.map(Into::into),
            stdout,
            tokenizer: (!no_tokens).then(|| tokenizer.into()),
        }),
        Commands::Tree {
            path,
            config,
            json,
            no_metadata,
            no_hidden,
            max_depth,
        } => run_tree(path, config, json, no_metadata, no_hidden, max_depth),
        Commands::Inspect {
            file,
            config,
            as_database,
            json,
        } => run_inspect(file, config, as_database, json),
        Commands::Config { config, show } => run_config(config, show),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "gitingest", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn setup_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info,ignore=warn,globset=warn"),
        2 => EnvFilter::new("debug,ignore=warn,globset=warn"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Digest { json, .. } => *json,
        Commands::Tree { json, .. } => *json,
        Commands::Inspect { json, .. } => *json,
        Commands::Config { .. } | Commands::Completions { .. } => false,
    }
}

fn serialization_error(e: serde_json::Error) -> IngestError {
    IngestError::Output(e.into())
}

// --- Digest command ---

struct DigestArgs {
    path: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    stdout: bool,
    tokenizer: Option<Tokenizer>,
}

fn run_digest(args: DigestArgs) -> Result<(), IngestError> {
    let mut config = Config::load(args.config.as_deref());
    if let Some(format) = args.format {
        config.project.output_format = format;
    }

    let digest = Ingest::new(&args.path).config(config.clone()).build()?;

    let options = OutputOptions {
        tokenizer: args.tokenizer,
        ..OutputOptions::from(&config)
    };
    let rendered = format_output(&digest, &options)?;

    if args.stdout {
        print!("{rendered}");
        return Ok(());
    }

    let target = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.project.output_file));
    write_output(&target, &rendered)?;

    info!(
        "wrote {} ({} files classified, {} redacted)",
        target.display(),
        digest.stats.processed(),
        digest.stats.redacted()
    );
    eprintln!("Digest written to {}", target.display());

    Ok(())
}

// --- Tree command ---

fn run_tree(
    path: PathBuf,
    config: Option<PathBuf>,
    json: bool,
    no_metadata: bool,
    no_hidden: bool,
    max_depth: Option<usize>,
) -> Result<(), IngestError> {
    let mut config = Config::load(config.as_deref());
    if no_hidden {
        config.tree.show_hidden = false;
    }
    if let Some(depth) = max_depth {
        config.tree.max_depth = depth;
    }

    let tree = tree_from_path(&path, &config)?;

    if json {
        let json =
            serde_json::to_string_pretty(&tree_to_json(&tree)).map_err(serialization_error)?;
        println!("{json}");
    } else {
        let render_opts = RenderOptions {
            show_size: !no_metadata,
            ..RenderOptions::default()
        };
        print!("{}", render_tree(&tree, &render_opts));
    }

    Ok(())
}

#[derive(Serialize)]
struct JsonTreeNode {
    name: String,
    path: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonTreeNode>,
}

fn tree_to_json(node: &FileNode) -> JsonTreeNode {
    let (kind, extension, size) = match &node.kind {
        NodeKind::Directory => ("directory".to_string(), None, None),
        NodeKind::File { extension, size } => ("file".to_string(), extension.clone(), Some(*size)),
    };

    JsonTreeNode {
        name: node.name.clone(),
        path: node.path.display().to_string(),
        kind,
        extension,
        size,
        children: node.children().iter().map(tree_to_json).collect(),
    }
}

// --- Inspect command ---

fn run_inspect(
    file: PathBuf,
    config: Option<PathBuf>,
    as_database: bool,
    json: bool,
) -> Result<(), IngestError> {
    if !file.exists() {
        return Err(IngestError::PathNotFound(file));
    }
    if !file.is_file() {
        return Err(IngestError::Io(std::io::Error::other(format!(
            "not a file: {}",
            file.display()
        ))));
    }

    let config = Config::load(config.as_deref());
    let root = file.parent().unwrap_or_else(|| Path::new(""));
    let entry = DiscoveredEntry::from_path(root, &file)?;
    let pipeline = Pipeline::new(&config);

    let verdict = if as_database {
        let kind = probe_kind(&entry);
        Verdict::Classified(pipeline.summarize_database(&entry, kind, entry.size))
    } else {
        pipeline.evaluate(&entry)
    };

    if json {
        let json = serde_json::to_string_pretty(&inspection(&entry, &verdict))
            .map_err(serialization_error)?;
        println!("{json}");
    } else {
        print!("{}", describe_verdict(&entry, &verdict));
    }

    Ok(())
}

#[derive(Serialize)]
struct Inspection {
    path: String,
    size: u64,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<serde_json::Value>,
}

fn inspection(entry: &DiscoveredEntry, verdict: &Verdict) -> Inspection {
    let mut out = Inspection {
        path: entry.path.display().to_string(),
        size: entry.size,
        kind: String::new(),
        reason: None,
        encoding: None,
        lines: None,
        content: None,
        database: None,
    };

    match verdict {
        Verdict::Ignored => out.kind = "ignored".to_string(),
        Verdict::Excluded(exclusion) => {
            out.kind = "excluded".to_string();
            out.reason = Some(exclusion.to_string());
        }
        Verdict::Classified(content) => {
            out.kind = content.kind().to_string();
            match content {
                Content::Text {
                    body,
                    encoding,
                    lines,
                } => {
                    out.encoding = Some(encoding.clone());
                    out.lines = Some(*lines);
                    out.content = Some(body.clone());
                }
                Content::Truncated {
                    body,
                    encoding,
                    total_lines,
                    ..
                } => {
                    out.encoding = Some(encoding.clone());
                    out.lines = Some(*total_lines);
                    out.content = Some(body.clone());
                }
                Content::Redacted { reason } => out.reason = Some(reason.to_string()),
                Content::Binary { note } => out.content = note.clone(),
                Content::Database {
                    summary,
                    description,
                } => {
                    out.content = Some(description.clone());
                    out.database = serde_json::to_value(summary).ok();
                }
                Content::Error(message) => out.reason = Some(message.clone()),
            }
        }
    }

    out
}

fn describe_verdict(entry: &DiscoveredEntry, verdict: &Verdict) -> String {
    let mut out = format!("{}\n", entry.path.display());

    match verdict {
        Verdict::Ignored => out.push_str("ignored\n"),
        Verdict::Excluded(exclusion) => out.push_str(&format!("excluded: {exclusion}\n")),
        Verdict::Classified(content) => match content {
            Content::Text {
                body,
                encoding,
                lines,
            } => {
                out.push_str(&format!("text ({encoding}, {lines} lines)\n\n{body}"));
            }
            Content::Truncated {
                body,
                encoding,
                total_lines,
                kept_lines,
            } => {
                out.push_str(&format!(
                    "truncated ({encoding}, {kept_lines} of {total_lines} lines)\n\n{body}"
                ));
            }
            Content::Redacted { reason } => {
                out.push_str(&format!("redacted: {reason}\n"));
            }
            Content::Binary { note } => {
                out.push_str("binary\n");
                if let Some(note) = note {
                    out.push_str(&format!("{note}\n"));
                }
            }
            Content::Database { description, .. } => {
                out.push_str(&format!("database\n\n{description}"));
            }
            Content::Error(message) => out.push_str(&format!("error: {message}\n")),
        },
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

// --- Config command ---

fn run_config(config: Option<PathBuf>, show: bool) -> Result<(), IngestError> {
    let config = Config::load(config.as_deref());

    if show {
        print!("{}", config.to_toml_string()?);
    } else {
        println!(
            "format: {}, output: {}, max file size: {} KB, tree depth: {}",
            config.project.output_format,
            config.project.output_file,
            config.filters.max_file_size,
            config.tree.max_depth
        );
    }

    Ok(())
}
