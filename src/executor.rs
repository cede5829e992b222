//! Task executor: the per-file pipeline and the worker pool that runs it.
//!
//! One task per candidate: load, transform, assemble metadata, score, then
//! apply the low-relevance gate. Tasks share only the read-only
//! [`TaskContext`], which holds the query model built before dispatch.
//! A panicking task becomes a `skipped_read_error_generic` record instead of
//! taking the run down.

use anyhow::{Context, Result};
use confluence_core::models::{approximate_word_count, Candidate, FileRecord, FileStatus};
use confluence_core::query::QueryModel;
use confluence_core::score::score;
use confluence_core::snippet::snippet;
use confluence_core::transform::{transform, TransformOptions};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::loader::load_file;
use crate::progress::{ProgressEvent, ProgressReporter};

/// Knobs every task reads.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSettings {
    pub max_file_size: u64,
    pub transform: TransformOptions,
    pub similarity_threshold: f64,
    pub keyword_boost: f64,
}

/// Immutable state shared by all workers for one run.
#[derive(Debug)]
pub struct TaskContext {
    pub query: Option<QueryModel>,
    pub settings: TaskSettings,
}

/// Run the full per-file pipeline for one candidate.
pub fn process_file(ctx: &TaskContext, candidate: &Candidate) -> FileRecord {
    let mut record = FileRecord::identity(
        candidate.path.to_string_lossy(),
        candidate.relative_path.clone(),
        FileStatus::Included,
    );

    let loaded = load_file(&candidate.path, ctx.settings.max_file_size);
    record.size_bytes = loaded.size_bytes;
    record.last_modified = loaded.modified;
    let decoded = match loaded.content {
        Ok(decoded) => decoded,
        Err(status) => {
            debug!(path = %candidate.relative_path, %status, "not loaded");
            record.status = status;
            return record;
        }
    };

    let text = transform(&decoded.text, record.language, ctx.settings.transform);
    record.encoding = Some(decoded.encoding.to_string());
    record.raw_char_count = decoded.text.chars().count();
    record.raw_word_count = approximate_word_count(&decoded.text);
    record.processed_char_count = text.chars().count();
    record.processed_word_count = approximate_word_count(&text);

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    record.content_sha256 = Some(format!("{:x}", hasher.finalize()));

    let query = ctx.query.as_ref();
    let scored = score(&text, query, ctx.settings.keyword_boost);
    record.similarity_score = scored.similarity;
    record.keyword_score = scored.keyword;
    record.relevance_score = scored.relevance;
    record.match_type = Some(scored.match_type);
    record.matched_keywords = scored.matched_keywords;
    record.snippet = Some(snippet(&text, |line| {
        query.is_some_and(|q| q.line_has_keyword(line))
    }));

    if query.is_some() && record.relevance_score < ctx.settings.similarity_threshold {
        record.status = FileStatus::ProcessedBelowThreshold;
    } else {
        record.content = Some(text);
    }
    record
}

/// Run `task`, turning a panic into a generic read-error record.
pub fn isolate(candidate: &Candidate, task: impl FnOnce() -> FileRecord) -> FileRecord {
    catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|_| {
        warn!(path = %candidate.relative_path, "worker task panicked");
        FileRecord::identity(
            candidate.path.to_string_lossy(),
            candidate.relative_path.clone(),
            FileStatus::SkippedReadErrorGeneric,
        )
    })
}

/// Process every candidate on a pool of `workers` threads (0 = one per
/// logical core). Returns one record per candidate, in no guaranteed order,
/// and the pool size actually used.
pub fn run_tasks(
    ctx: &TaskContext,
    candidates: &[Candidate],
    workers: usize,
    progress: &dyn ProgressReporter,
) -> Result<(Vec<FileRecord>, usize)> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("confluence-worker-{i}"))
        .build()
        .with_context(|| "Failed to start worker pool")?;
    let threads = pool.current_num_threads();
    debug!(threads, files = candidates.len(), "dispatching");

    let total = candidates.len() as u64;
    let done = AtomicU64::new(0);
    let records = pool.install(|| {
        candidates
            .par_iter()
            .map(|candidate| {
                let record = isolate(candidate, || process_file(ctx, candidate));
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                progress.report(ProgressEvent::Processing { n, total });
                record
            })
            .collect()
    });
    Ok((records, threads))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use confluence_core::models::{DiscoveryOutcome, MatchType};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn settings() -> TaskSettings {
        TaskSettings {
            max_file_size: 1024,
            transform: TransformOptions::default(),
            similarity_threshold: 0.05,
            keyword_boost: 1.5,
        }
    }

    fn candidate(root: &Path, rel: &str, body: &[u8]) -> Candidate {
        let path = root.join(rel);
        fs::write(&path, body).unwrap();
        Candidate {
            path,
            relative_path: rel.to_string(),
            outcome: DiscoveryOutcome::Included,
        }
    }

    #[test]
    fn test_unscored_file_is_included_with_content() {
        let tmp = TempDir::new().unwrap();
        let c = candidate(tmp.path(), "a.rs", b"fn main() {}\n");
        let ctx = TaskContext {
            query: None,
            settings: settings(),
        };
        let r = process_file(&ctx, &c);
        assert_eq!(r.status, FileStatus::Included);
        assert_eq!(r.match_type, Some(MatchType::NotScoredNoQuery));
        assert_eq!(r.relevance_score, 0.0);
        assert_eq!(r.content.as_deref(), Some("fn main() {}\n"));
        assert_eq!(r.size_bytes, Some(13));
        assert_eq!(r.raw_word_count, 3);
        assert_eq!(r.content_sha256.as_ref().map(|h| h.len()), Some(64));
    }

    #[test]
    fn test_below_threshold_keeps_scores_drops_content() {
        let tmp = TempDir::new().unwrap();
        let c = candidate(tmp.path(), "b.rs", b"let unrelated = 1;\n");
        let ctx = TaskContext {
            query: Some(QueryModel::build("database migration", &[], 10).unwrap()),
            settings: settings(),
        };
        let r = process_file(&ctx, &c);
        assert_eq!(r.status, FileStatus::ProcessedBelowThreshold);
        assert!(r.content.is_none());
        assert_eq!(r.match_type, Some(MatchType::NoDiscernibleMatch));
        assert!(r.snippet.is_some());
    }

    #[test]
    fn test_relevant_file_is_included() {
        let tmp = TempDir::new().unwrap();
        let c = candidate(tmp.path(), "m.py", b"# run the database migration\nmigrate()\n");
        let mut s = settings();
        s.transform.strip_comments = true;
        let ctx = TaskContext {
            query: Some(QueryModel::build("database migration", &[], 10).unwrap()),
            settings: s,
        };
        let r = process_file(&ctx, &c);
        // the only matching text was a comment
        assert_eq!(r.status, FileStatus::ProcessedBelowThreshold);

        let c = candidate(tmp.path(), "n.py", b"def database_migration():\n    database = migration = 1\n");
        let r = process_file(&ctx, &c);
        assert_eq!(r.status, FileStatus::Included);
        assert!(r.relevance_score >= 0.05);
        assert!(r.content.is_some());
    }

    #[test]
    fn test_oversized_file_never_scored() {
        let tmp = TempDir::new().unwrap();
        let c = candidate(tmp.path(), "big.txt", &[b'a'; 2048]);
        let ctx = TaskContext {
            query: Some(QueryModel::build("anything relevant", &[], 10).unwrap()),
            settings: settings(),
        };
        let r = process_file(&ctx, &c);
        assert_eq!(r.status, FileStatus::SkippedSize);
        assert!(r.content.is_none());
        assert!(r.match_type.is_none());
    }

    #[test]
    fn test_panicking_task_becomes_generic_error() {
        let c = Candidate {
            path: "/nowhere/x.rs".into(),
            relative_path: "x.rs".into(),
            outcome: DiscoveryOutcome::Included,
        };
        let r = isolate(&c, || panic!("boom"));
        assert_eq!(r.status, FileStatus::SkippedReadErrorGeneric);
        assert_eq!(r.relative_path, "x.rs");
    }

    #[test]
    fn test_pool_returns_one_record_per_candidate() {
        let tmp = TempDir::new().unwrap();
        let candidates: Vec<_> = (0..12)
            .map(|i| candidate(tmp.path(), &format!("f{i}.rs"), b"fn f() {}"))
            .collect();
        let ctx = TaskContext {
            query: None,
            settings: settings(),
        };
        let (records, threads) = run_tasks(&ctx, &candidates, 3, &NoProgress).unwrap();
        assert_eq!(threads, 3);
        assert_eq!(records.len(), 12);
        assert!(records.iter().all(|r| r.status == FileStatus::Included));
    }
}
