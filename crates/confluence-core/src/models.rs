//! Core data models used throughout Confluence.
//!
//! These types represent the candidates, file records, and status values
//! that flow through the discovery, processing, ranking, and packing
//! pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::language::Language;

/// Outcome of classifying one filesystem entry during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryOutcome {
    Included,
    IgnoredDirectory,
    NoMatchingRule,
}

/// A filesystem entry together with its discovery outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub relative_path: String,
    pub outcome: DiscoveryOutcome,
}

/// Per-record processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Processed and selected into the in-context set.
    Included,
    /// Processed and scored, but below the relevance threshold.
    ProcessedBelowThreshold,
    SkippedSize,
    SkippedDecodeError,
    SkippedReadErrorNotFound,
    SkippedReadErrorPermission,
    SkippedReadErrorGeneric,
    /// Rejected by directory rules; never reached the loader.
    IgnoredDirectory,
    /// Rejected by file rules; never reached the loader.
    NoMatchingRule,
}

impl FileStatus {
    pub const ALL: [FileStatus; 9] = [
        FileStatus::Included,
        FileStatus::ProcessedBelowThreshold,
        FileStatus::SkippedSize,
        FileStatus::SkippedDecodeError,
        FileStatus::SkippedReadErrorNotFound,
        FileStatus::SkippedReadErrorPermission,
        FileStatus::SkippedReadErrorGeneric,
        FileStatus::IgnoredDirectory,
        FileStatus::NoMatchingRule,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Included => "included",
            FileStatus::ProcessedBelowThreshold => "processed_below_threshold",
            FileStatus::SkippedSize => "skipped_size",
            FileStatus::SkippedDecodeError => "skipped_decode_error",
            FileStatus::SkippedReadErrorNotFound => "skipped_read_error_not_found",
            FileStatus::SkippedReadErrorPermission => "skipped_read_error_permission",
            FileStatus::SkippedReadErrorGeneric => "skipped_read_error_generic",
            FileStatus::IgnoredDirectory => "ignored_directory",
            FileStatus::NoMatchingRule => "no_matching_rule",
        }
    }
}

impl DiscoveryOutcome {
    /// Catalog status for a rejected entry; `None` for candidates.
    pub fn rejection_status(self) -> Option<FileStatus> {
        match self {
            DiscoveryOutcome::Included => None,
            DiscoveryOutcome::IgnoredDirectory => Some(FileStatus::IgnoredDirectory),
            DiscoveryOutcome::NoMatchingRule => Some(FileStatus::NoMatchingRule),
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a scored file matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    SimilarityAndKeyword,
    KeywordDominant,
    SimilarityDominant,
    NoDiscernibleMatch,
    NotScoredNoQuery,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::SimilarityAndKeyword => "similarity_and_keyword",
            MatchType::KeywordDominant => "keyword_dominant",
            MatchType::SimilarityDominant => "similarity_dominant",
            MatchType::NoDiscernibleMatch => "no_discernible_match",
            MatchType::NotScoredNoQuery => "not_scored_no_query",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a ranked record landed in the packed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackStatus {
    Included,
    Partial,
    Excluded,
}

/// One processed (or rejected) file.
///
/// Created by exactly one worker (or by the aggregator for rule
/// rejections) and read-only afterwards, except for `rank` and `packing`
/// which the aggregator and packer fill in on the single collecting thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path.
    pub path: String,
    /// Path relative to the scan root, `/`-separated.
    pub relative_path: String,
    pub file_name: String,
    /// Lowercase extension including the dot, or empty.
    pub extension: String,
    pub language: Language,
    pub size_bytes: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Encoding that successfully decoded the file.
    pub encoding: Option<String>,
    pub raw_char_count: usize,
    pub processed_char_count: usize,
    pub raw_word_count: usize,
    pub processed_word_count: usize,
    pub similarity_score: f64,
    pub keyword_score: f64,
    pub relevance_score: f64,
    pub match_type: Option<MatchType>,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    pub snippet: Option<String>,
    /// SHA-256 (hex) of the transformed content.
    pub content_sha256: Option<String>,
    pub rank: Option<usize>,
    pub packing: Option<PackStatus>,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileRecord {
    /// A record carrying only identity and status, for files that never
    /// produced content.
    pub fn identity(path: impl Into<String>, relative_path: impl Into<String>, status: FileStatus) -> Self {
        let path = path.into();
        let relative_path = relative_path.into();
        let file_name = relative_path
            .rsplit('/')
            .next()
            .unwrap_or(relative_path.as_str())
            .to_string();
        let extension = extension_of(&file_name);
        let language = Language::detect(&file_name);
        FileRecord {
            path,
            relative_path,
            file_name,
            extension,
            language,
            size_bytes: None,
            last_modified: None,
            encoding: None,
            raw_char_count: 0,
            processed_char_count: 0,
            raw_word_count: 0,
            processed_word_count: 0,
            similarity_score: 0.0,
            keyword_score: 0.0,
            relevance_score: 0.0,
            match_type: None,
            matched_keywords: Vec::new(),
            snippet: None,
            content_sha256: None,
            rank: None,
            packing: None,
            status,
            content: None,
        }
    }
}

/// Lowercase extension of a file name including the leading dot, or `""`.
///
/// Dotfiles such as `.gitignore` have no extension.
pub fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!(".{}", ext.to_lowercase()),
        _ => String::new(),
    }
}

/// Approximate word count: number of whitespace-separated runs.
pub fn approximate_word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_record_derives_name_extension_language() {
        let rec = FileRecord::identity("/repo/src/Main.PY", "src/Main.PY", FileStatus::SkippedSize);
        assert_eq!(rec.file_name, "Main.PY");
        assert_eq!(rec.extension, ".py");
        assert_eq!(rec.language, Language::Python);
        assert!(rec.content.is_none());
        assert_eq!(rec.status, FileStatus::SkippedSize);
    }

    #[test]
    fn test_extension_of_handles_dotfiles_and_multi_dots() {
        assert_eq!(extension_of(".gitignore"), "");
        assert_eq!(extension_of("a.tar.GZ"), ".gz");
        assert_eq!(extension_of("Makefile"), "");
    }

    #[test]
    fn test_status_serializes_to_taxonomy_names() {
        for status in FileStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_content_is_omitted_from_json_when_absent() {
        let rec = FileRecord::identity("/r/a.txt", "a.txt", FileStatus::NoMatchingRule);
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["status"], "no_matching_rule");
    }

    #[test]
    fn test_word_count_splits_on_any_whitespace() {
        assert_eq!(approximate_word_count("  one\ttwo\n\nthree  "), 3);
        assert_eq!(approximate_word_count(""), 0);
    }
}
