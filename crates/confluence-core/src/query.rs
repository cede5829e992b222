//! The per-run query model built once from the prompt.
//!
//! Holds the keyword list and the prompt's term vector. Similarity is
//! prompt-relative: documents are projected onto the prompt's vocabulary
//! only, so terms the prompt never mentions do not count. With a single
//! fitted document every IDF weight is equal, so the vector is plain term
//! frequency, L2-normalised.
//!
//! The model is immutable after [`QueryModel::build`] and is shared
//! read-only across workers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::CoreError;
use crate::keywords::{extract_keywords, is_stop_word};

static TERM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid term pattern"));

/// Lowercase indexable terms of `text`: two or more word characters, stop
/// words removed.
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    TERM.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| !is_stop_word(t))
}

/// Which keywords a document contains and how often.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordHits {
    /// Distinct keywords found, in keyword-list order.
    pub matched: Vec<String>,
    /// Total occurrences across all keywords.
    pub occurrences: usize,
}

#[derive(Debug, Clone)]
pub struct QueryModel {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    /// Term -> index into `weights`.
    vocabulary: HashMap<String, usize>,
    weights: Vec<f64>,
}

impl QueryModel {
    /// Build the model from a prompt.
    ///
    /// `pinned` keywords come first and are not counted against
    /// `max_keywords`; extracted keywords follow, skipping duplicates.
    pub fn build(prompt: &str, pinned: &[String], max_keywords: usize) -> Result<Self, CoreError> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for term in terms(prompt) {
            *counts.entry(term).or_default() += 1;
        }
        if counts.is_empty() {
            return Err(CoreError::EmptyVocabulary);
        }

        let norm = counts.values().map(|&c| (c * c) as f64).sum::<f64>().sqrt();
        let mut vocabulary = HashMap::with_capacity(counts.len());
        let mut weights = Vec::with_capacity(counts.len());
        for (i, (term, count)) in counts.into_iter().enumerate() {
            vocabulary.insert(term, i);
            weights.push(count as f64 / norm);
        }

        let mut keywords: Vec<String> = Vec::new();
        for kw in pinned {
            let kw = kw.trim().to_lowercase();
            if !kw.is_empty() && !keywords.contains(&kw) {
                keywords.push(kw);
            }
        }
        let pinned_count = keywords.len();
        for kw in extract_keywords(prompt, max_keywords) {
            if keywords.len() - pinned_count >= max_keywords {
                break;
            }
            if !keywords.contains(&kw) {
                keywords.push(kw);
            }
        }

        let patterns = keywords.iter().filter_map(|kw| keyword_pattern(kw)).collect();

        debug!(
            vocabulary = vocabulary.len(),
            keywords = ?keywords,
            "query model built"
        );

        Ok(QueryModel {
            keywords,
            patterns,
            vocabulary,
            weights,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Prompt vocabulary, sorted.
    pub fn vocabulary(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.vocabulary.keys().map(String::as_str).collect();
        terms.sort_unstable();
        terms
    }

    /// Cosine similarity between `text` and the prompt, in `[0, 1]`.
    pub fn similarity(&self, text: &str) -> f64 {
        let mut counts = vec![0usize; self.weights.len()];
        for term in terms(text) {
            if let Some(&i) = self.vocabulary.get(&term) {
                counts[i] += 1;
            }
        }
        let norm = counts.iter().map(|&c| (c * c) as f64).sum::<f64>().sqrt();
        if norm == 0.0 {
            return 0.0;
        }
        let dot: f64 = counts
            .iter()
            .zip(&self.weights)
            .map(|(&c, w)| c as f64 * w)
            .sum();
        (dot / norm).clamp(0.0, 1.0)
    }

    /// Case-insensitive whole-word keyword matches in `text`.
    pub fn keyword_hits(&self, text: &str) -> KeywordHits {
        let mut hits = KeywordHits::default();
        for (kw, pattern) in self.keywords.iter().zip(&self.patterns) {
            let n = pattern.find_iter(text).count();
            if n > 0 {
                hits.matched.push(kw.clone());
                hits.occurrences += n;
            }
        }
        hits
    }

    /// Whether a single line contains any keyword.
    pub fn line_has_keyword(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(line))
    }
}

/// Whole-word, case-insensitive pattern; inner whitespace matches any run.
fn keyword_pattern(keyword: &str) -> Option<Regex> {
    let body = keyword
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    Regex::new(&format!(r"(?i)\b{body}\b")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(prompt: &str) -> QueryModel {
        QueryModel::build(prompt, &[], 10).unwrap()
    }

    #[test]
    fn test_empty_vocabulary_is_an_error() {
        assert_eq!(
            QueryModel::build("the of a", &[], 10).unwrap_err(),
            CoreError::EmptyVocabulary
        );
        assert!(QueryModel::build("", &[], 10).is_err());
    }

    #[test]
    fn test_vocabulary_drops_stop_words_and_short_tokens() {
        let m = model("Refresh the OAuth token in a handler");
        assert_eq!(m.vocabulary(), vec!["handler", "oauth", "refresh", "token"]);
    }

    #[test]
    fn test_similarity_is_prompt_relative() {
        let m = model("database migration rollback");
        assert_eq!(m.similarity("nothing relevant here at all"), 0.0);
        let full = m.similarity("database migration rollback");
        assert!((full - 1.0).abs() < 1e-9);
        let partial = m.similarity("database pool sizing and unrelated words");
        assert!(partial > 0.0 && partial < full);
        // extra vocabulary outside the prompt does not dilute the score
        let noisy = m.similarity("database migration rollback plus many other words");
        assert!((noisy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pinned_keywords_come_first_and_are_not_capped() {
        let pinned = vec!["Zorblat".to_string(), "zorblat".to_string(), "quux".to_string()];
        let m = QueryModel::build("cache invalidation strategy", &pinned, 1).unwrap();
        assert_eq!(&m.keywords()[..2], &["zorblat".to_string(), "quux".to_string()]);
        assert_eq!(m.keywords().len(), 3);
    }

    #[test]
    fn test_keyword_hits_are_whole_word_and_case_insensitive() {
        let m = QueryModel::build("x", &["token".to_string(), "auth flow".to_string()], 0);
        assert!(m.is_err(), "single-char prompt has no vocabulary");

        let m = QueryModel::build("tokens", &["token".to_string(), "auth flow".to_string()], 0).unwrap();
        let hits = m.keyword_hits("TOKEN here, tokens there, Auth   Flow and token.");
        assert_eq!(hits.matched, vec!["token".to_string(), "auth flow".to_string()]);
        assert_eq!(hits.occurrences, 3);
        assert!(m.line_has_keyword("the Token"));
        assert!(!m.line_has_keyword("tokenizer"));
    }
}
