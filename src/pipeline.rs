//! Run orchestration: build the query model, discover, process in parallel,
//! rank, pack, and summarise.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use confluence_core::models::{FileRecord, FileStatus, PackStatus};
use confluence_core::pack::{pack, PackedOutput};
use confluence_core::query::QueryModel;
use confluence_core::rank::{rank, Ranked};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::executor::{run_tasks, TaskContext, TaskSettings};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::rules::{discover, RuleSet};

/// Facts about one run, written at the top of the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub root: String,
    pub prompt: Option<String>,
    /// Effective keyword list; empty without a prompt.
    pub keywords: Vec<String>,
    pub settings: Config,
    pub workers: usize,
    pub status_counts: BTreeMap<FileStatus, usize>,
    pub in_context: usize,
    pub cataloged_only: usize,
    pub packed_words: usize,
    pub packed_included: usize,
    pub packed_partial: usize,
    pub packed_excluded: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub summary: RunSummary,
    pub ranked: Ranked,
    pub packed: PackedOutput,
}

/// Build the query model for a prompt; blank prompts mean no model.
pub fn build_query(prompt: Option<&str>, config: &Config) -> Result<Option<QueryModel>> {
    match prompt.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(p) => QueryModel::build(p, &config.scoring.keywords, config.scoring.max_keywords)
            .map(Some)
            .with_context(|| "Cannot score files against this prompt"),
    }
}

/// Run the whole pipeline over `root`.
pub fn run(
    root: &Path,
    prompt: Option<&str>,
    config: &Config,
    progress: &dyn ProgressReporter,
) -> Result<RunOutput> {
    let started_at = Utc::now();
    let clock = Instant::now();

    let query = build_query(prompt, config)?;
    let keywords = query
        .as_ref()
        .map(|q| q.keywords().to_vec())
        .unwrap_or_default();
    if query.is_some() {
        info!(keywords = ?keywords, "scoring against prompt");
    } else {
        info!("no prompt given, files will be ordered by path");
    }

    let rules = RuleSet::from_filters(&config.filters)?;
    progress.report(ProgressEvent::Discovering {
        root: root.display().to_string(),
    });
    let discovery = discover(root, &rules, config.filters.follow_symlinks);
    let candidates: Vec<_> = discovery.included().cloned().collect();
    let rejected: Vec<FileRecord> = discovery
        .rejected()
        .filter_map(|c| {
            c.outcome.rejection_status().map(|status| {
                FileRecord::identity(c.path.to_string_lossy(), c.relative_path.clone(), status)
            })
        })
        .chain(discovery.walk_errors.iter().cloned())
        .collect();
    progress.report(ProgressEvent::Discovered {
        candidates: candidates.len() as u64,
        rejected: rejected.len() as u64,
    });
    info!(
        candidates = candidates.len(),
        rejected = rejected.len(),
        "discovery complete"
    );

    let scored = query.is_some();
    let ctx = TaskContext {
        query,
        settings: TaskSettings {
            max_file_size: config.limits.max_file_size,
            transform: config.transform.options(),
            similarity_threshold: config.scoring.similarity_threshold,
            keyword_boost: config.scoring.keyword_boost,
        },
    };
    let (mut records, workers) = run_tasks(&ctx, &candidates, config.workers.count, progress)?;
    records.extend(rejected);

    let mut status_counts: BTreeMap<FileStatus, usize> =
        FileStatus::ALL.iter().map(|&s| (s, 0)).collect();
    for record in &records {
        *status_counts.entry(record.status).or_default() += 1;
    }

    let mut ranked = rank(records, scored);
    let packed = pack(&mut ranked.in_context, config.output.max_words);
    progress.report(ProgressEvent::Packed {
        included: packed.count(PackStatus::Included) as u64,
        partial: packed.count(PackStatus::Partial) as u64,
        words: packed.total_words as u64,
    });
    info!(
        in_context = ranked.in_context.len(),
        cataloged_only = ranked.cataloged_only.len(),
        packed_words = packed.total_words,
        "run complete"
    );

    let summary = RunSummary {
        run_id: Uuid::new_v4(),
        started_at,
        duration_ms: clock.elapsed().as_millis() as u64,
        root: root.display().to_string(),
        prompt: prompt.map(str::to_string),
        keywords,
        settings: config.clone(),
        workers,
        status_counts,
        in_context: ranked.in_context.len(),
        cataloged_only: ranked.cataloged_only.len(),
        packed_words: packed.total_words,
        packed_included: packed.count(PackStatus::Included),
        packed_partial: packed.count(PackStatus::Partial),
        packed_excluded: packed.count(PackStatus::Excluded),
    };

    Ok(RunOutput {
        summary,
        ranked,
        packed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_prompt_means_no_query() {
        let cfg = Config::default();
        assert!(build_query(None, &cfg).unwrap().is_none());
        assert!(build_query(Some("   \n"), &cfg).unwrap().is_none());
    }

    #[test]
    fn test_stop_word_prompt_is_fatal() {
        let err = build_query(Some("the and of"), &Config::default()).unwrap_err();
        assert!(format!("{err:#}").contains("empty vocabulary"));
    }

    #[test]
    fn test_pinned_keywords_flow_into_query() {
        let mut cfg = Config::default();
        cfg.scoring.keywords = vec!["zorblat".into()];
        let q = build_query(Some("refactor parser"), &cfg).unwrap().unwrap();
        assert_eq!(q.keywords()[0], "zorblat");
    }
}
