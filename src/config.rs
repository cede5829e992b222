//! TOML configuration.
//!
//! Every key has a default, so an empty file (or no file at all) is a valid
//! configuration. CLI flags are applied on top of the loaded values by the
//! binary before [`Config::validate`] runs.
//!
//! ```toml
//! [filters]
//! preset = "code"
//! exclude = ["min.js"]
//! ignore_dirs = ["vendor"]
//!
//! [scoring]
//! similarity_threshold = 0.05
//! keyword_boost = 1.5
//!
//! [output]
//! max_words = 50000
//! ```

use anyhow::{bail, Context, Result};
use confluence_core::transform::TransformOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::rules::{build_globset, Preset};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "confluence.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct FiltersConfig {
    #[serde(default)]
    pub preset: Preset,
    /// Extensions or exact file names; when non-empty, overrides the preset.
    #[serde(default)]
    pub include: Vec<String>,
    /// Extensions added to the baseline exclusion set.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Directory names ignored in addition to the built-in set.
    #[serde(default)]
    pub ignore_dirs: Vec<String>,
    /// Glob patterns matched against the relative path.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct TransformConfig {
    #[serde(default)]
    pub minify_whitespace: bool,
    #[serde(default)]
    pub strip_comments: bool,
}

impl TransformConfig {
    pub fn options(&self) -> TransformOptions {
        TransformOptions {
            minify_whitespace: self.minify_whitespace,
            strip_comments: self.strip_comments,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScoringConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_keyword_boost")]
    pub keyword_boost: f64,
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
    /// Always part of the keyword list, ahead of extracted keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            keyword_boost: default_keyword_boost(),
            max_keywords: default_max_keywords(),
            keywords: Vec::new(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.05
}
fn default_keyword_boost() -> f64 {
    1.5
}
fn default_max_keywords() -> usize {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_json_path")]
    pub json: PathBuf,
    #[serde(default = "default_flat_path")]
    pub flat: PathBuf,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    /// Wrap the packed text in the aggregation template.
    #[serde(default)]
    pub template: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: default_json_path(),
            flat: default_flat_path(),
            max_words: default_max_words(),
            template: false,
        }
    }
}

fn default_json_path() -> PathBuf {
    PathBuf::from("confluence_output.json")
}
fn default_flat_path() -> PathBuf {
    PathBuf::from("confluence_output.txt")
}
fn default_max_words() -> usize {
    50_000
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct WorkersConfig {
    /// Worker threads; 0 uses the number of logical cores.
    #[serde(default)]
    pub count: usize,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_file_size == 0 {
            bail!("limits.max_file_size must be > 0");
        }

        let threshold = self.scoring.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            bail!("scoring.similarity_threshold must be in [0.0, 1.0], got {threshold}");
        }
        let boost = self.scoring.keyword_boost;
        if !boost.is_finite() || boost < 0.0 {
            bail!("scoring.keyword_boost must be >= 0, got {boost}");
        }
        if self.scoring.max_keywords == 0 {
            bail!("scoring.max_keywords must be >= 1");
        }

        if self.output.max_words == 0 {
            bail!("output.max_words must be > 0");
        }

        build_globset(&self.filters.exclude_globs)
            .with_context(|| "filters.exclude_globs contains an invalid glob")?;

        Ok(())
    }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, `./confluence.toml` is used if
/// present, else the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.is_file() {
                return Ok(Config::default());
            }
            fallback
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}
