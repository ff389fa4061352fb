//! f5-lint CLI entry point

use clap::{Parser, Subcommand};
use f5_lint::output::{self, FileFindings};
use f5_lint::{catalog_stats, CliOptions, Config, DiagnosticEngine, RuleCatalog, TextUnit};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use rayon::prelude::*;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "f5-lint")]
#[command(author, version, about = "Rule-driven diagnostics for F5 TMOS and NGINX configuration", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Files to scan (globs allowed). Use "-" for stdin.
    files: Vec<PathBuf>,

    /// Rule catalog (JSON or YAML)
    #[arg(long, env = "F5_LINT_CATALOG", global = true)]
    catalog: Option<PathBuf>,

    /// Config file path (default: auto-detect .f5lintrc.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Treat inputs as JSON text units (a string or nested arrays of strings)
    #[arg(long)]
    units: bool,

    /// Scan files even when they are not recognized as TMOS or NGINX
    #[arg(long)]
    all: bool,

    /// Only run these rules (comma-separated or repeated)
    #[arg(long, value_name = "CODE", value_delimiter = ',')]
    select: Vec<String>,

    /// Skip these rules (comma-separated or repeated)
    #[arg(long, value_name = "CODE", value_delimiter = ',')]
    ignore: Vec<String>,

    /// Show counts per severity at the end
    #[arg(long)]
    statistics: bool,

    /// Number of parallel jobs (0 = auto, 1 = sequential)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show catalog statistics and list the rules
    Rules {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ListFormat,
    },
    /// Open the rule catalog in $VISUAL or $EDITOR, then validate it
    Edit,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Sarif,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum ListFormat {
    #[default]
    Text,
    Json,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load or create configuration
    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        let start_dir = std::env::current_dir().into_diagnostic()?;
        match Config::find_and_load(&start_dir) {
            Ok(Some((path, cfg))) => {
                tracing::debug!("Using config: {}", path.display());
                cfg
            }
            Ok(None) => Config::default(),
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    };

    config.merge_cli(CliOptions {
        catalog: cli.catalog.clone(),
        enabled_rules: if cli.select.is_empty() {
            None
        } else {
            Some(cli.select.clone())
        },
        disabled_rules: cli.ignore.clone(),
        statistics: cli.statistics,
        jobs: cli.jobs,
    });

    let catalog_path = config.catalog_path();

    match &cli.command {
        Some(Commands::Rules { format }) => list_rules(&catalog_path, *format),
        Some(Commands::Edit) => edit_catalog(&catalog_path),
        None => scan_files(&cli, &config, &catalog_path),
    }
}

fn load_catalog(path: &Path) -> Result<RuleCatalog> {
    let catalog = RuleCatalog::load(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to load rule catalog {}", path.display()))?;
    tracing::debug!("Loaded {} rules from {}", catalog.len(), path.display());
    Ok(catalog)
}

fn list_rules(catalog_path: &Path, format: ListFormat) -> Result<ExitCode> {
    let catalog = load_catalog(catalog_path)?;
    let stats = catalog_stats(&catalog);

    match format {
        ListFormat::Text => print!("{}", output::format_catalog_text(&catalog, &stats)),
        ListFormat::Json => {
            println!(
                "{}",
                output::format_catalog_json(&catalog, &stats).into_diagnostic()?
            );
        }
    }

    Ok(ExitCode::from(0))
}

fn edit_catalog(catalog_path: &Path) -> Result<ExitCode> {
    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .map_err(|_| miette!("Neither $VISUAL nor $EDITOR is set"))?;

    let (program, args) =
        split_editor(&editor).ok_or_else(|| miette!("Editor variable is empty"))?;

    let status = Command::new(program)
        .args(args)
        .arg(catalog_path)
        .status()
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to start editor '{}'", editor))?;

    if !status.success() {
        return Err(miette!("Editor '{}' exited with {}", editor, status));
    }

    let catalog = load_catalog(catalog_path)?;
    let stats = catalog_stats(&catalog);
    eprintln!(
        "{}: {} rules ({} active)",
        catalog_path.display(),
        stats.total,
        stats.active_rules
    );

    Ok(ExitCode::from(0))
}

/// Split an editor setting such as `code --wait` into program and leading args
fn split_editor(editor: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = editor.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

fn scan_files(cli: &Cli, config: &Config, catalog_path: &Path) -> Result<ExitCode> {
    if cli.files.is_empty() {
        return Err(miette!("No input files given (use \"-\" for stdin)"));
    }

    if !config.enabled {
        eprintln!("Diagnostics are disabled by configuration");
        return Ok(ExitCode::from(0));
    }

    // A broken catalog is reported once, before any file is read
    let catalog = config.apply_to_catalog(&load_catalog(catalog_path)?);
    let engine = DiagnosticEngine::new(&catalog);

    let files = collect_files(cli, config)?;
    if files.is_empty() {
        eprintln!("No files to scan");
        return Ok(ExitCode::from(0));
    }

    if config.jobs > 1 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build_global()
            .ok();
    }

    let scan = |file: &PathBuf| {
        tracing::debug!("Scanning: {}", file.display());
        scan_single_file(file, &engine, cli.units)
    };
    let outcomes: Vec<Result<FileFindings>> = if config.jobs == 1 {
        files.iter().map(scan).collect()
    } else {
        files.par_iter().map(scan).collect()
    };

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = 0;
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("Error: {e:?}");
                failures += 1;
            }
        }
    }

    match cli.format {
        OutputFormat::Text => output::print_text(&results),
        OutputFormat::Json => output::print_json(&results).into_diagnostic()?,
        OutputFormat::Sarif => output::print_sarif(&results).into_diagnostic()?,
    }

    let stats = output::summarize(&results);
    if config.statistics {
        output::print_statistics(&stats);
    }

    if matches!(cli.format, OutputFormat::Text) {
        let file_count = results.len();
        let file_word = if file_count == 1 { "file" } else { "files" };
        if stats.is_empty() {
            eprintln!("\nNo issues found in {} {}", file_count, file_word);
        } else {
            eprintln!(
                "\nFound {} issue{} in {} {}",
                stats.total(),
                if stats.total() == 1 { "" } else { "s" },
                file_count,
                file_word
            );
        }
    }

    // Exit codes
    if stats.error_count() > 0 || failures > 0 {
        Ok(ExitCode::from(2))
    } else if stats.warning_count() > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::from(0))
    }
}

fn collect_files(cli: &Cli, config: &Config) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in &cli.files {
        let pattern_str = pattern.to_string_lossy();

        // Handle stdin
        if pattern_str == "-" {
            files.push(PathBuf::from("-"));
            continue;
        }

        if pattern_str.contains('*') || pattern_str.contains('?') || pattern_str.contains('[') {
            for entry in glob::glob(&pattern_str).into_diagnostic()? {
                let path = entry.into_diagnostic()?;
                if should_scan_file(&path, config, cli.all) {
                    files.push(path);
                }
            }
        } else if should_scan_file(pattern, config, cli.all) {
            files.push(pattern.clone());
        }
    }

    Ok(files)
}

fn should_scan_file(path: &Path, config: &Config, all: bool) -> bool {
    if config.is_file_excluded(path) {
        return false;
    }
    if all {
        return true;
    }
    match config.documents.kind_of(path) {
        Some(kind) => {
            tracing::debug!("{} is a {} document", path.display(), kind);
            true
        }
        None => {
            tracing::debug!("Skipping unrecognized file: {}", path.display());
            false
        }
    }
}

fn scan_single_file(file: &Path, engine: &DiagnosticEngine, units: bool) -> Result<FileFindings> {
    let display = file.display().to_string();

    let content = if display == "-" {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content).into_diagnostic()?;
        content
    } else {
        std::fs::read_to_string(file)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read {}", display))?
    };

    if units {
        let unit = TextUnit::from_json_str(&content)
            .into_diagnostic()
            .wrap_err_with(|| format!("{} is not a valid text unit", display))?;
        // Lines are leaf-relative, so there is no single source to quote
        let source = match unit {
            TextUnit::Leaf(ref text) => Some(text.clone()),
            TextUnit::Group(_) => None,
        };
        return Ok(FileFindings::new(display, source, engine.scan(&unit)));
    }

    let findings = engine.scan_text(&content);
    Ok(FileFindings::new(display, Some(content), findings))
}
