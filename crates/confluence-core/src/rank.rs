//! Partitioning results into the in-context and cataloged-only sets.

use serde::Serialize;
use std::cmp::Ordering;

use crate::models::{FileRecord, FileStatus};

/// Records split by whether they go into the packed context.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ranked {
    /// Sorted and ranked 1..N.
    pub in_context: Vec<FileRecord>,
    /// Everything else, sorted by relative path, without content.
    pub cataloged_only: Vec<FileRecord>,
}

/// Partition and order worker results.
///
/// `scored` says whether a query model was used: with one, in-context
/// records sort by relevance descending (ties by path); without one, by
/// path only. Completion order of the input is irrelevant.
pub fn rank(records: Vec<FileRecord>, scored: bool) -> Ranked {
    let (mut in_context, mut cataloged_only): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| r.status == FileStatus::Included);

    if scored {
        in_context.sort_by(by_relevance);
    } else {
        in_context.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    }
    for (i, record) in in_context.iter_mut().enumerate() {
        record.rank = Some(i + 1);
    }

    for record in &mut cataloged_only {
        record.content = None;
        record.rank = None;
    }
    cataloged_only.sort_by(|a, b| {
        a.relative_path
            .cmp(&b.relative_path)
            .then(a.status.cmp(&b.status))
    });

    Ranked {
        in_context,
        cataloged_only,
    }
}

fn by_relevance(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| a.relative_path.cmp(&b.relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, score: f64, status: FileStatus) -> FileRecord {
        let mut r = FileRecord::identity(format!("/root/{path}"), path, status);
        r.relevance_score = score;
        r.content = Some(format!("content of {path}"));
        r
    }

    #[test]
    fn test_sorts_by_score_then_path() {
        let ranked = rank(
            vec![
                record("b.rs", 0.5, FileStatus::Included),
                record("a.rs", 0.5, FileStatus::Included),
                record("c.rs", 0.9, FileStatus::Included),
                record("d.rs", 0.01, FileStatus::ProcessedBelowThreshold),
            ],
            true,
        );
        let order: Vec<_> = ranked.in_context.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(order, vec!["c.rs", "a.rs", "b.rs"]);
        let ranks: Vec<_> = ranked.in_context.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(ranked.cataloged_only.len(), 1);
        assert!(ranked.cataloged_only[0].content.is_none());
    }

    #[test]
    fn test_unscored_runs_sort_by_path() {
        let ranked = rank(
            vec![
                record("z.md", 0.0, FileStatus::Included),
                record("a/b.md", 0.0, FileStatus::Included),
                record("m.md", 0.0, FileStatus::Included),
            ],
            false,
        );
        let order: Vec<_> = ranked.in_context.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(order, vec!["a/b.md", "m.md", "z.md"]);
    }

    #[test]
    fn test_cataloged_only_sorted_by_path() {
        let ranked = rank(
            vec![
                record("z.bin", 0.0, FileStatus::SkippedDecodeError),
                record("node_modules", 0.0, FileStatus::IgnoredDirectory),
                record("big.log", 0.0, FileStatus::SkippedSize),
            ],
            true,
        );
        assert!(ranked.in_context.is_empty());
        let order: Vec<_> = ranked.cataloged_only.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(order, vec!["big.log", "node_modules", "z.bin"]);
    }
}
