//! Discovery rules and the directory walk.
//!
//! Classifies every entry under the scan root as a candidate or a rejection.
//! Resolution order for a file:
//!
//! 1. any relative path segment equal (case-insensitively) to an ignored
//!    directory name: `ignored_directory`;
//! 2. relative path matching an exclude glob: `no_matching_rule`;
//! 3. with an explicit include list: match iff the extension or the full
//!    lowercase file name is listed (the preset is not consulted);
//! 4. otherwise: excluded extensions never match, `all_text` matches the
//!    rest, other presets match their own extensions and file names.
//!
//! Ignored directories are not descended into; each is recorded once.
//! Symlinks to files are classified like their target. Entries that are not
//! regular files (dangling links, sockets, links to directories when links
//! are not followed) are recorded as `no_matching_rule`.

use anyhow::Result;
use confluence_core::models::{extension_of, Candidate, DiscoveryOutcome, FileRecord, FileStatus};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::FiltersConfig;

pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git", "__pycache__", "node_modules", "venv", ".venv", "target", "build", "dist", ".vscode",
    ".idea", "logs", "temp", "tmp", ".DS_Store", "Thumbs.db",
];

/// Binary, archive, media and scratch extensions that never match unless
/// explicitly included.
pub const BASELINE_EXCLUDED_EXTENSIONS: &[&str] = &[
    ".exe", ".dll", ".so", ".o", ".a", ".lib", ".jar", ".war", ".class", ".pyc", ".pyo", ".zip",
    ".tar", ".gz", ".bz2", ".rar", ".7z", ".tgz", ".png", ".jpg", ".jpeg", ".gif", ".bmp",
    ".tiff", ".ico", ".svg", ".mp3", ".wav", ".ogg", ".mp4", ".avi", ".mov", ".mkv", ".flv",
    ".pdf", ".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx", ".odt", ".ods", ".odp", ".db",
    ".sqlite", ".mdb", ".accdb", ".dat", ".idx", ".log", ".tmp", ".temp", ".bak", ".swp",
    ".swo", ".lock",
];

const CODE_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".c", ".cpp", ".h", ".hpp", ".cs", ".go",
    ".rs", ".swift", ".kt", ".kts", ".scala", ".rb", ".pl", ".sh", ".bash", ".zsh", ".ps1",
    ".php", ".groovy", ".dart", ".lua", ".r", ".m", ".sql", ".yaml", ".yml", ".json", ".xml",
    ".html", ".css", ".tf", ".hcl", ".ini", ".cfg", ".conf", ".properties", ".toml",
];

const CODE_FILE_NAMES: &[&str] = &["makefile", "dockerfile", "justfile", "cmakelists.txt"];

const DOCS_EXTENSIONS: &[&str] = &[
    ".md", ".txt", ".rst", ".tex", ".adoc", ".org", ".asciidoc", ".rtf", ".html", ".xml",
    ".json", ".csv", ".yaml", ".yml", ".ini", ".cfg", ".conf", ".properties", ".toml",
];

/// Named base set of file types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Source code and configuration.
    #[default]
    Code,
    /// Prose and structured documents.
    Docs,
    /// Anything not excluded.
    #[value(name = "all_text")]
    AllText,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Code, Preset::Docs, Preset::AllText];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Code => "code",
            Preset::Docs => "docs",
            Preset::AllText => "all_text",
        }
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Preset::Code => CODE_EXTENSIONS,
            Preset::Docs => DOCS_EXTENSIONS,
            Preset::AllText => &[],
        }
    }

    pub fn file_names(self) -> &'static [&'static str] {
        match self {
            Preset::Code => CODE_FILE_NAMES,
            Preset::Docs | Preset::AllText => &[],
        }
    }
}

/// `"py"`, `".py"` and `" .PY "` all become `".py"`.
fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.').to_lowercase();
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{trimmed}"))
    }
}

/// Compiled discovery rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    include_extensions: HashSet<String>,
    include_names: HashSet<String>,
    preset: Preset,
    targets: HashSet<String>,
    target_names: HashSet<String>,
    exclusions: HashSet<String>,
    ignore_dirs: HashSet<String>,
    exclude_globs: GlobSet,
}

impl RuleSet {
    pub fn from_filters(filters: &FiltersConfig) -> Result<Self> {
        let mut include_extensions = HashSet::new();
        let mut include_names = HashSet::new();
        for entry in &filters.include {
            if let Some(ext) = normalize_extension(entry) {
                include_extensions.insert(ext);
                include_names.insert(entry.trim().to_lowercase());
            }
        }

        let mut exclusions: HashSet<String> =
            BASELINE_EXCLUDED_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        exclusions.extend(filters.exclude.iter().filter_map(|e| normalize_extension(e)));

        let targets = filters
            .preset
            .extensions()
            .iter()
            .map(|e| e.to_string())
            .filter(|e| !exclusions.contains(e))
            .collect();
        let target_names = filters.preset.file_names().iter().map(|n| n.to_string()).collect();

        let ignore_dirs = DEFAULT_IGNORE_DIRS
            .iter()
            .map(|d| d.to_string())
            .chain(filters.ignore_dirs.iter().map(|d| d.trim().to_string()))
            .filter(|d| !d.is_empty())
            .map(|d| d.to_lowercase())
            .collect();

        Ok(Self {
            include_extensions,
            include_names,
            preset: filters.preset,
            targets,
            target_names,
            exclusions,
            ignore_dirs,
            exclude_globs: build_globset(&filters.exclude_globs)?,
        })
    }

    pub fn is_ignored_dir_name(&self, name: &str) -> bool {
        self.ignore_dirs.contains(&name.to_lowercase())
    }

    /// Classify a regular file by its `/`-separated relative path.
    pub fn classify(&self, relative_path: &str) -> DiscoveryOutcome {
        if relative_path.split('/').any(|seg| self.is_ignored_dir_name(seg)) {
            return DiscoveryOutcome::IgnoredDirectory;
        }
        if self.exclude_globs.is_match(relative_path) {
            return DiscoveryOutcome::NoMatchingRule;
        }
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        if self.matches_file(file_name) {
            DiscoveryOutcome::Included
        } else {
            DiscoveryOutcome::NoMatchingRule
        }
    }

    fn matches_file(&self, file_name: &str) -> bool {
        let ext = extension_of(file_name);
        let lower = file_name.to_lowercase();

        if !self.include_extensions.is_empty() {
            return (!ext.is_empty() && self.include_extensions.contains(&ext))
                || self.include_names.contains(&lower);
        }
        if !ext.is_empty() && self.exclusions.contains(&ext) {
            return false;
        }
        match self.preset {
            Preset::AllText => true,
            Preset::Code | Preset::Docs => {
                (!ext.is_empty() && self.targets.contains(&ext)) || self.target_names.contains(&lower)
            }
        }
    }
}

/// Result of walking the scan root.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Every classified entry, in walk order (sorted by file name per directory).
    pub candidates: Vec<Candidate>,
    /// Subtrees or entries the walk could not read.
    pub walk_errors: Vec<FileRecord>,
}

impl Discovery {
    pub fn included(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(|c| c.outcome == DiscoveryOutcome::Included)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(|c| c.outcome != DiscoveryOutcome::Included)
    }
}

/// `/`-separated path of `path` relative to `root`.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk `root` and classify every entry. Never fails: unreadable entries
/// become catalog records.
pub fn discover(root: &Path, rules: &RuleSet, follow_symlinks: bool) -> Discovery {
    let mut discovery = Discovery::default();
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(follow_symlinks)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                let status = match e.io_error().map(|io| io.kind()) {
                    Some(ErrorKind::PermissionDenied) => FileStatus::SkippedReadErrorPermission,
                    _ => FileStatus::SkippedReadErrorGeneric,
                };
                warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                discovery.walk_errors.push(FileRecord::identity(
                    path.to_string_lossy(),
                    relative_path(root, &path),
                    status,
                ));
                continue;
            }
        };

        let rel = relative_path(root, entry.path());
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if rules.is_ignored_dir_name(&entry.file_name().to_string_lossy()) {
                debug!(path = %rel, "ignored directory");
                discovery.candidates.push(Candidate {
                    path: entry.path().to_path_buf(),
                    relative_path: rel,
                    outcome: DiscoveryOutcome::IgnoredDirectory,
                });
                walker.skip_current_dir();
            }
            continue;
        }
        // symlinks are judged by their target; dangling links and special files never load
        let is_file = if file_type.is_symlink() {
            entry.path().is_file()
        } else {
            file_type.is_file()
        };
        let outcome = match rules.classify(&rel) {
            DiscoveryOutcome::Included if !is_file => {
                debug!(path = %rel, "not a regular file");
                DiscoveryOutcome::NoMatchingRule
            }
            outcome => outcome,
        };
        discovery.candidates.push(Candidate {
            path: entry.path().to_path_buf(),
            relative_path: rel,
            outcome,
        });
    }

    debug!(
        candidates = discovery.included().count(),
        rejected = discovery.rejected().count(),
        errors = discovery.walk_errors.len(),
        "discovery complete"
    );
    discovery
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
