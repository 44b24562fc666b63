use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use redact_engine::{
    build_mapping_with, decode_report, decode_word, load_from_path, parse_detector_output,
    EngineConfig, Mapping, RedactionSession, RedactionStatus,
};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "redact-engine")]
#[command(about = "Reversible entity redaction for text files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Redact a text file using detector output
    Redact {
        /// Text file to redact
        input: PathBuf,

        /// JSON array of detected entities (start, end, category or entity_group)
        #[arg(short, long)]
        entities: PathBuf,

        /// Engine config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output path (defaults to <name>-REDACTED.<ext> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the placeholder mapping as JSON
        #[arg(short, long)]
        mapping_out: Option<PathBuf>,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Restore a redacted file with a saved mapping
    Restore {
        /// Redacted text file
        input: PathBuf,

        /// Mapping JSON written by `redact --mapping-out` or `map`
        #[arg(short, long)]
        mapping: PathBuf,

        /// Output path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rebuild the mapping from an original file and its redacted version
    Map {
        /// Original text file
        #[arg(long)]
        original: PathBuf,

        /// Redacted text file
        #[arg(long)]
        redacted: PathBuf,

        /// Engine config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a single placeholder token
    DecodeWord {
        /// Token to resolve, e.g. "[PER]"
        word: String,

        /// Mapping JSON
        #[arg(short, long)]
        mapping: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Redact {
            input,
            entities,
            config,
            output,
            mapping_out,
            diff,
        } => cmd_redact(&input, &entities, config, output, mapping_out, diff),

        Commands::Restore {
            input,
            mapping,
            output,
        } => cmd_restore(&input, &mapping, output),

        Commands::Map {
            original,
            redacted,
            config,
            output,
        } => cmd_map(&original, &redacted, config, output),

        Commands::DecodeWord { word, mapping } => cmd_decode_word(&word, &mapping),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => Ok(load_from_path(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_mapping(path: &Path) -> Result<Mapping> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse mapping JSON from {}", path.display()))
}

/// Helper: `<name>-REDACTED.<ext>` next to the input.
fn redacted_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}-REDACTED.{}", ext.to_string_lossy()),
        None => format!("{stem}-REDACTED"),
    };
    input.with_file_name(name)
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the destination is left untouched.
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Helper: Show unified diff between original and redacted content
fn display_diff(file: &Path, original: &str, redacted: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (redacted)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, redacted);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_redact(
    input: &Path,
    entities: &Path,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    mapping_out: Option<PathBuf>,
    show_diff: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let text = read_text(input)?;
    let entities_json = read_text(entities)?;

    // Detection already ran; the entities file stands in for the detector.
    let detector = |_: &str| parse_detector_output(&entities_json);
    let mut session = RedactionSession::new(config);

    let redaction = match session.redact_with(&detector, &text) {
        Ok(redaction) => redaction,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            anyhow::bail!(
                "refusing to write unredacted text for {}; check {}",
                input.display(),
                entities.display()
            );
        }
    };

    match redaction.status {
        RedactionStatus::Redacted => {}
        RedactionStatus::EmptyInput => {
            println!("{}", "Input is empty, nothing to redact".yellow());
            return Ok(());
        }
        RedactionStatus::TooLong { len, limit } => {
            println!(
                "{}",
                format!("Input length {len} exceeds limit {limit}, left unredacted").yellow()
            );
            return Ok(());
        }
    }

    for issue in &redaction.issues {
        println!("{} Dropped {}", "⊘".yellow(), issue);
    }

    let output = output.unwrap_or_else(|| redacted_path(input));
    atomic_write(&output, redaction.text.as_bytes())?;

    if let Some(path) = mapping_out {
        let json = serde_json::to_string_pretty(&redaction.mapping)?;
        atomic_write(&path, json.as_bytes())?;
        println!("Mapping: {}", path.display());
    }

    if show_diff && redaction.text != text {
        display_diff(input, &text, &redaction.text);
    }

    println!(
        "{} Redacted {} entities into {}",
        "✓".green(),
        redaction.spans.len(),
        output.display()
    );

    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} applied",
        format!("{}", redaction.spans.len()).green()
    );
    println!(
        "  {} dropped",
        format!("{}", redaction.issues.len()).yellow()
    );
    println!(
        "  {} placeholders mapped",
        format!("{}", redaction.mapping.len()).cyan()
    );

    Ok(())
}

fn cmd_restore(input: &Path, mapping: &Path, output: Option<PathBuf>) -> Result<()> {
    let mapping = read_mapping(mapping)?;
    let text = read_text(input)?;

    let decoded = decode_report(&text, &mapping);
    for token in &decoded.unresolved {
        eprintln!("{} Unresolved placeholder {}", "⊙".yellow(), token);
    }

    match output {
        Some(path) => {
            atomic_write(&path, decoded.text.as_bytes())?;
            eprintln!(
                "{} Restored {} placeholders into {}",
                "✓".green(),
                decoded.resolved,
                path.display()
            );
        }
        None => print!("{}", decoded.text),
    }

    Ok(())
}

fn cmd_map(
    original: &Path,
    redacted: &Path,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config)?;
    let original = read_text(original)?;
    let redacted = read_text(redacted)?;

    let mapping = build_mapping_with(&redacted, &original, config.collision_policy);
    let json = serde_json::to_string_pretty(&mapping)?;

    match output {
        Some(path) => atomic_write(&path, json.as_bytes())?,
        None => println!("{json}"),
    }

    Ok(())
}

fn cmd_decode_word(word: &str, mapping: &Path) -> Result<()> {
    let mapping = read_mapping(mapping)?;
    println!("{}", decode_word(word, &mapping));
    Ok(())
}
