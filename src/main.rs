//! # Confluence CLI (`confluence`)
//!
//! Walks a project directory, keeps the files that match the selection
//! rules, scores them against an optional prompt, and packs the most
//! relevant ones into a word-bounded text bundle.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `confluence run <DIR>` | Run the pipeline and write the report and packed text |
//! | `confluence presets` | List the built-in file presets |
//! | `confluence completions <SHELL>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Everything under ./src, ordered by path
//! confluence run ./src
//!
//! # Score against a prompt and keep the bundle under 8000 words
//! confluence run . --prompt "how is the cache invalidated?" --max-words 8000
//!
//! # Docs only, prompt from a file, comments stripped
//! confluence run . --preset docs --prompt-file task.md --strip-comments
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use confluence::config::{self, Config};
use confluence::pipeline;
use confluence::progress::ProgressMode;
use confluence::report;
use confluence::rules::Preset;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Confluence: pack the files that matter for a prompt into one bounded
/// context bundle.
///
/// All commands accept `--config` pointing to a TOML file; without it,
/// `./confluence.toml` is read when present.
#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Select, score and pack project files into a bounded LLM context bundle",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set (e.g. `debug`, `confluence=trace`).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory and produce the JSON report and packed text.
    Run(RunArgs),

    /// List the built-in presets and the extensions they match.
    Presets,

    /// Print a shell completion script to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Directory to scan.
    directory: PathBuf,

    /// Task description to score files against.
    #[arg(long, conflicts_with = "prompt_file")]
    prompt: Option<String>,

    /// Read the task description from a UTF-8 file.
    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// File preset to use when no explicit include list is given.
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Comma-separated extensions or file names to include (overrides the preset).
    #[arg(long, value_delimiter = ',')]
    include_ext: Vec<String>,

    /// Comma-separated extensions to exclude, on top of the built-in list.
    #[arg(long, value_delimiter = ',')]
    exclude_ext: Vec<String>,

    /// Directory name to skip (repeatable).
    #[arg(long)]
    ignore_dir: Vec<String>,

    /// Glob matched against relative paths to skip (repeatable).
    #[arg(long)]
    exclude_glob: Vec<String>,

    /// Minimum relevance for a scored file to stay in context.
    #[arg(long)]
    similarity_threshold: Option<f64>,

    /// Weight of the keyword score relative to similarity.
    #[arg(long)]
    keyword_boost: Option<f64>,

    /// Keyword that is always searched for (repeatable).
    #[arg(long)]
    keyword: Vec<String>,

    /// Largest file to read, in bytes.
    #[arg(long)]
    max_file_size: Option<u64>,

    /// Word budget for the packed text.
    #[arg(long)]
    max_words: Option<usize>,

    /// Worker threads (0 = one per logical core).
    #[arg(long)]
    workers: Option<usize>,

    /// Collapse whitespace in file contents.
    #[arg(long)]
    minify: bool,

    /// Remove comments and docstrings from source files.
    #[arg(long)]
    strip_comments: bool,

    /// Where to write the JSON report.
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Where to write the packed text.
    #[arg(long)]
    output_flat: Option<PathBuf>,

    /// Wrap the packed text in the aggregation template.
    #[arg(long)]
    template: bool,

    /// Progress output on stderr. Defaults to `human` on a terminal, else `off`.
    #[arg(long, value_enum)]
    progress: Option<ProgressMode>,
}

impl RunArgs {
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(preset) = self.preset {
            cfg.filters.preset = preset;
        }
        if !self.include_ext.is_empty() {
            cfg.filters.include = self.include_ext.clone();
        }
        cfg.filters.exclude.extend(self.exclude_ext.iter().cloned());
        cfg.filters.ignore_dirs.extend(self.ignore_dir.iter().cloned());
        cfg.filters.exclude_globs.extend(self.exclude_glob.iter().cloned());

        if let Some(v) = self.similarity_threshold {
            cfg.scoring.similarity_threshold = v;
        }
        if let Some(v) = self.keyword_boost {
            cfg.scoring.keyword_boost = v;
        }
        cfg.scoring.keywords.extend(self.keyword.iter().cloned());

        if let Some(v) = self.max_file_size {
            cfg.limits.max_file_size = v;
        }
        if let Some(v) = self.max_words {
            cfg.output.max_words = v;
        }
        if let Some(v) = self.workers {
            cfg.workers.count = v;
        }

        cfg.transform.minify_whitespace |= self.minify;
        cfg.transform.strip_comments |= self.strip_comments;

        if let Some(p) = &self.output_json {
            cfg.output.json = p.clone();
        }
        if let Some(p) = &self.output_flat {
            cfg.output.flat = p.clone();
        }
        cfg.output.template |= self.template;
    }

    fn prompt(&self) -> Result<Option<String>> {
        let prompt = match (&self.prompt, &self.prompt_file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => read_prompt_file(path)?,
            (None, None) => return Ok(None),
        };
        if prompt.trim().is_empty() {
            bail!("Prompt is empty");
        }
        Ok(Some(prompt))
    }
}

fn read_prompt_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
    String::from_utf8(bytes)
        .with_context(|| format!("Prompt file is not valid UTF-8: {}", path.display()))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli_config: Option<&Path>, args: RunArgs) -> Result<()> {
    if !args.directory.is_dir() {
        bail!("Not a directory: {}", args.directory.display());
    }
    let prompt = args.prompt()?;

    let mut cfg = config::load_config(cli_config)?;
    args.apply_to(&mut cfg);
    cfg.validate().with_context(|| "Invalid settings")?;

    let mode = args.progress.unwrap_or_else(ProgressMode::default_for_tty);
    let reporter = mode.reporter();
    let output = pipeline::run(&args.directory, prompt.as_deref(), &cfg, reporter.as_ref())?;

    report::write_json_report(&cfg.output.json, &output)?;
    let flat = report::render_flat(&output, cfg.output.template);
    report::write_flat(&cfg.output.flat, &flat)?;

    let s = &output.summary;
    println!(
        "{} files in context, {} cataloged only; packed {} words ({} full, {} partial) -> {}, {}",
        s.in_context,
        s.cataloged_only,
        s.packed_words,
        s.packed_included,
        s.packed_partial,
        cfg.output.json.display(),
        cfg.output.flat.display()
    );
    Ok(())
}

fn list_presets() {
    for preset in Preset::ALL {
        let mut matches: Vec<&str> = preset.extensions().to_vec();
        matches.extend(preset.file_names());
        if matches.is_empty() {
            println!("{:<10} any file not excluded", preset.name());
        } else {
            println!("{:<10} {}", preset.name(), matches.join(" "));
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Run(args) => run(cli.config.as_deref(), args)?,
        Commands::Presets => list_presets(),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "confluence",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
