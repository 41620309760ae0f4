//! Command-line interface for driftcheck.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{self, Config};
use crate::extract::{self, Registry, SourceKind};
use crate::report::{self, RunInfo};
use crate::score::Analyzer;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directory names never walked into.
const SKIPPED_DIRS: &[&str] = &[
    "vendor",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    "venv",
];

/// Documentation drift detection.
///
/// Extracts function signatures from code and documentation, pairs them,
/// and reports how far the documentation has drifted from the code.
#[derive(Parser)]
#[command(name = "driftcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by DRIFTCHECK_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check documentation against code
    Check(CheckArgs),
    /// Print the signatures extracted from one file as JSON
    Extract(ExtractArgs),
    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Path to check (file or directory)
    pub path: PathBuf,

    /// Separate documentation tree (default: documentation found under PATH)
    #[arg(short, long)]
    pub docs: Option<PathBuf>,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Minimum acceptable trust score (exit non-zero below it)
    #[arg(short, long, default_value_t = 0)]
    pub min_trust: u32,
}

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// File to extract signatures from
    pub file: PathBuf,
}

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "driftcheck.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Default configuration written by `init`.
pub const CONFIG_TEMPLATE: &str = include_str!("templates/driftcheck.yaml");

/// A file read for extraction.
struct SourceFile {
    identifier: String,
    text: String,
}

/// Collect files the registry can extract from.
fn collect_files(root: &Path, registry: &Registry, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&&*name)
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if config.is_path_excluded(relative) {
            tracing::debug!(file = %relative.display(), "excluded by configuration");
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if registry.for_identifier(name).is_some() {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Read files, keeping those whose extractor produces `kind`.
fn read_sources(root: &Path, files: &[PathBuf], registry: &Registry, kind: SourceKind) -> Vec<SourceFile> {
    files
        .iter()
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            registry.source_kind(name) == Some(kind)
        })
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(text) => {
                let relative = path.strip_prefix(root).unwrap_or(path.as_path());
                let identifier = if relative.as_os_str().is_empty() {
                    path.file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default()
                } else {
                    relative.to_string_lossy().replace('\\', "/")
                };
                Some(SourceFile { identifier, text })
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file");
                None
            }
        })
        .collect()
}

fn extract_sources(registry: &Registry, sources: &[SourceFile]) -> Vec<crate::signature::FunctionSignature> {
    let pairs: Vec<(&str, &str)> = sources
        .iter()
        .map(|s| (s.identifier.as_str(), s.text.as_str()))
        .collect();
    registry.extract_all(&pairs)
}

/// Resolve a path and list its extractable files.
fn gather(path: &Path, registry: &Registry, config: &Config) -> anyhow::Result<(PathBuf, Vec<PathBuf>)> {
    let abs = path
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("cannot access path {:?}: {}", path, e))?;
    if abs.is_dir() {
        let files = collect_files(&abs, registry, config)?;
        Ok((abs, files))
    } else {
        let root = abs.parent().map(Path::to_path_buf).unwrap_or_else(|| abs.clone());
        Ok((root, vec![abs]))
    }
}

/// Run the check command.
pub async fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", args.format);
        return Ok(EXIT_ERROR);
    }
    if args.min_trust > 100 {
        eprintln!("Error: --min-trust must be between 0 and 100");
        return Ok(EXIT_ERROR);
    }

    let (config, config_path) = match Config::load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let registry = extract::default_registry();

    let (code_root, code_files) = match gather(&args.path, registry, &config) {
        Ok(found) => found,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let (docs_root, docs_files) = match &args.docs {
        Some(docs) => match gather(docs, registry, &config) {
            Ok(found) => found,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Ok(EXIT_ERROR);
            }
        },
        None => (code_root.clone(), code_files.clone()),
    };

    let code_sources = read_sources(&code_root, &code_files, registry, SourceKind::Code);
    let doc_sources = read_sources(&docs_root, &docs_files, registry, SourceKind::Docs);
    let files_scanned = code_sources.len() + doc_sources.len();
    if files_scanned == 0 {
        eprintln!("Warning: no files to scan");
        return Ok(EXIT_SUCCESS);
    }

    let code = extract_sources(registry, &code_sources);
    let docs = extract_sources(registry, &doc_sources);
    tracing::info!(
        code_files = code_sources.len(),
        doc_files = doc_sources.len(),
        code_signatures = code.len(),
        doc_signatures = docs.len(),
        "extraction complete"
    );

    let analyzer = match Analyzer::from_config(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Set {} or point reasoning.api_key_env at your key", config.reasoning.api_key_env);
            return Ok(EXIT_ERROR);
        }
    };
    let report_data = match analyzer.analyze(&code, &docs).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let info = RunInfo {
        path: args.path.to_string_lossy().to_string(),
        docs_path: args.docs.as_ref().map(|d| d.to_string_lossy().to_string()),
        config_path: config_path.map(|p| p.to_string_lossy().to_string()),
        files_scanned,
        min_trust: args.min_trust,
    };

    match args.format.as_str() {
        "json" => report::write_json(&info, &report_data)?,
        _ => report::write_pretty(&info, &report_data),
    }

    if info.passed(&report_data) {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the extract command.
pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<i32> {
    let text = match std::fs::read_to_string(&args.file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", args.file.display(), e);
            return Ok(EXIT_ERROR);
        }
    };
    let identifier = args.file.to_string_lossy().replace('\\', "/");

    let registry = extract::default_registry();
    if registry.for_identifier(&identifier).is_none() {
        eprintln!(
            "Warning: unsupported file type (supported: {})",
            registry.supported_suffixes().join(" ")
        );
    }

    let signatures = registry.extract(&text, &identifier);
    println!("{}", serde_json::to_string_pretty(&signatures)?);
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it, pass --force, or use --output to choose a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, CONFIG_TEMPLATE) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Export your reasoning service key (GEMINI_API_KEY by default)");
    println!("  2. Run: driftcheck check . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

/// Check that a configuration file parses and validates.
pub fn validate_config_file(path: &Path) -> anyhow::Result<Config> {
    let config = Config::parse_file(path)?;
    config::validate(&config)?;
    Ok(config)
}
