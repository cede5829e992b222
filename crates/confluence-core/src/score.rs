//! Relevance scoring: similarity and keyword signals and their combination.

use tracing::debug;

use crate::models::{approximate_word_count, MatchType};
use crate::query::QueryModel;

/// Similarity at or above this counts as a similarity match.
pub const SIMILARITY_PRESENCE: f64 = 0.02;
/// Keyword score at or above this counts as a keyword match.
pub const KEYWORD_PRESENCE: f64 = 0.05;
/// Both signals at or below this combine to zero.
pub const SIGNAL_FLOOR: f64 = 0.001;

const COVERAGE_WEIGHT: f64 = 0.6;
const DENSITY_CAP: f64 = 0.4;
const DENSITY_SCALE: f64 = 10.0;

/// Result of scoring one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub relevance: f64,
    pub similarity: f64,
    pub keyword: f64,
    pub match_type: MatchType,
    pub matched_keywords: Vec<String>,
}

impl Score {
    pub fn unscored() -> Self {
        Score {
            relevance: 0.0,
            similarity: 0.0,
            keyword: 0.0,
            match_type: MatchType::NotScoredNoQuery,
            matched_keywords: Vec::new(),
        }
    }
}

/// Score `text` against the query. Without a query nothing is computed.
pub fn score(text: &str, query: Option<&QueryModel>, keyword_boost: f64) -> Score {
    let Some(query) = query else {
        return Score::unscored();
    };

    let similarity = finite_or_zero(query.similarity(text), "similarity");
    let hits = query.keyword_hits(text);
    let keyword = finite_or_zero(
        keyword_score(
            hits.matched.len(),
            query.keywords().len(),
            hits.occurrences,
            approximate_word_count(text),
        ),
        "keyword",
    );

    Score {
        relevance: combine(similarity, keyword, keyword_boost),
        similarity,
        keyword,
        match_type: classify(similarity, keyword),
        matched_keywords: hits.matched,
    }
}

/// `min((found/total)*0.6 + min(occurrences/(words+1)*10, 0.4), 1.0)`;
/// zero when there are no keywords.
pub fn keyword_score(found: usize, total: usize, occurrences: usize, words: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let coverage = found as f64 / total as f64 * COVERAGE_WEIGHT;
    let density = (occurrences as f64 / (words + 1) as f64 * DENSITY_SCALE).min(DENSITY_CAP);
    (coverage + density).min(1.0)
}

/// Weighted average of the two signals, `boost` weighting keywords.
pub fn combine(similarity: f64, keyword: f64, boost: f64) -> f64 {
    if similarity <= SIGNAL_FLOOR && keyword <= SIGNAL_FLOOR {
        return 0.0;
    }
    ((similarity + keyword * boost) / (1.0 + boost)).min(1.0)
}

pub fn classify(similarity: f64, keyword: f64) -> MatchType {
    match (similarity >= SIMILARITY_PRESENCE, keyword >= KEYWORD_PRESENCE) {
        (true, true) => MatchType::SimilarityAndKeyword,
        (false, true) => MatchType::KeywordDominant,
        (true, false) => MatchType::SimilarityDominant,
        (false, false) => MatchType::NoDiscernibleMatch,
    }
}

fn finite_or_zero(value: f64, component: &str) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        debug!(component, "non-finite score component, using 0");
        0.0
    }
}
