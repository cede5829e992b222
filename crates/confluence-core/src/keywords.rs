//! Statistical keyword extraction from a single prompt.
//!
//! A YAKE-style extractor: no corpus, no model files. Each term is weighted
//! by its casing, position, frequency, how many distinct neighbours it has
//! and how many sentences it spreads over. Candidate phrases of one to three
//! words (never starting or ending on a stop word) are scored from their
//! terms; lower scores are better. Near-duplicate phrases are dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Longest candidate phrase, in words.
pub const MAX_NGRAM: usize = 3;

/// Phrases at least this similar to an already selected one are dropped.
const DEDUP_THRESHOLD: f64 = 0.9;

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?;:\n]+").expect("valid sentence pattern"));
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word pattern"));

/// English stop words, the usual information-retrieval list.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here", "hereafter",
    "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his", "how", "however",
    "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its",
    "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many",
    "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly",
    "move", "much", "must", "my", "myself", "name", "namely", "neither", "never",
    "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not", "nothing",
    "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other",
    "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part", "per",
    "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed", "seeming",
    "seems", "serious", "several", "she", "should", "show", "side", "since", "sincere", "six",
    "sixty", "so", "some", "somehow", "someone", "something", "sometime", "sometimes",
    "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the", "their",
    "them", "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore",
    "therein", "thereupon", "these", "they", "thick", "thin", "third", "this", "those", "though",
    "three", "through", "throughout", "thru", "thus", "to", "together", "too", "top", "toward",
    "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon", "us", "very",
    "via", "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever",
    "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever", "whether",
    "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why", "will",
    "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

static STOP_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

/// Whether a lowercase token is an English stop word.
pub fn is_stop_word(token: &str) -> bool {
    STOP_SET.contains(token)
}

#[derive(Default)]
struct TermStats {
    tf: usize,
    tf_upper: usize,
    tf_capital: usize,
    sentences: BTreeSet<usize>,
    sentence_hits: Vec<usize>,
    left: HashSet<String>,
    right: HashSet<String>,
}

struct Phrase {
    text: String,
    terms: Vec<String>,
    tf: usize,
    first_pos: usize,
}

fn is_noise(lower: &str) -> bool {
    lower.chars().count() < 2 || lower.chars().all(|c| c.is_numeric()) || is_stop_word(lower)
}

/// Extract up to `max` keywords from `text`, best first, lowercased.
///
/// Falls back to the first `max` distinct lowercase words when no candidate
/// phrase survives stop-word filtering.
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
    if max == 0 {
        return Vec::new();
    }

    let sentences: Vec<Vec<(String, String)>> = SENTENCE_BREAK
        .split(text)
        .map(|s| {
            WORD.find_iter(s)
                .map(|m| (m.as_str().to_string(), m.as_str().to_lowercase()))
                .collect::<Vec<_>>()
        })
        .filter(|tokens| !tokens.is_empty())
        .collect();

    let mut stats: HashMap<String, TermStats> = HashMap::new();
    let mut phrases: HashMap<String, Phrase> = HashMap::new();
    let mut position = 0usize;

    for (sid, tokens) in sentences.iter().enumerate() {
        for (i, (orig, lower)) in tokens.iter().enumerate() {
            let entry = stats.entry(lower.clone()).or_default();
            entry.tf += 1;
            if orig.chars().count() > 1 && orig.chars().all(|c| !c.is_lowercase()) && orig.chars().any(|c| c.is_uppercase()) {
                entry.tf_upper += 1;
            } else if i > 0 && orig.chars().next().is_some_and(|c| c.is_uppercase()) {
                entry.tf_capital += 1;
            }
            entry.sentences.insert(sid);
            entry.sentence_hits.push(sid);
            if i > 0 {
                entry.left.insert(tokens[i - 1].1.clone());
            }
            if let Some((_, next)) = tokens.get(i + 1) {
                entry.right.insert(next.clone());
            }

            for n in 1..=MAX_NGRAM {
                let Some(window) = tokens.get(i..i + n) else { break };
                let first = &window[0].1;
                let last = &window[n - 1].1;
                if is_noise(first) || is_noise(last) {
                    continue;
                }
                let key = window.iter().map(|(_, l)| l.as_str()).collect::<Vec<_>>().join(" ");
                let phrase = phrases.entry(key.clone()).or_insert_with(|| Phrase {
                    text: key,
                    terms: window.iter().map(|(_, l)| l.clone()).filter(|l| !is_noise(l)).collect(),
                    tf: 0,
                    first_pos: position,
                });
                phrase.tf += 1;
            }
            position += 1;
        }
    }

    let weights = term_weights(&stats, sentences.len());

    let mut scored: Vec<(f64, Phrase)> = phrases
        .into_values()
        .map(|p| {
            let (prod, sum) = p.terms.iter().fold((1.0f64, 0.0f64), |(prod, sum), t| {
                let h = weights.get(t).copied().unwrap_or(1.0);
                (prod * h, sum + h)
            });
            (prod / (p.tf as f64 * (1.0 + sum)), p)
        })
        .collect();
    scored.sort_by(|(sa, pa), (sb, pb)| {
        sa.total_cmp(sb)
            .then(pa.first_pos.cmp(&pb.first_pos))
            .then(pa.text.cmp(&pb.text))
    });

    let mut selected: Vec<String> = Vec::new();
    for (_, phrase) in scored {
        if selected.len() >= max {
            break;
        }
        if selected.iter().any(|s| similarity_ratio(s, &phrase.text) >= DEDUP_THRESHOLD) {
            continue;
        }
        selected.push(phrase.text);
    }

    if selected.is_empty() {
        let mut seen = HashSet::new();
        for m in WORD.find_iter(text) {
            let lower = m.as_str().to_lowercase();
            if seen.insert(lower.clone()) {
                selected.push(lower);
                if selected.len() >= max {
                    break;
                }
            }
        }
    }
    selected
}

/// Per-term weight; lower means more important.
fn term_weights(stats: &HashMap<String, TermStats>, sentence_count: usize) -> HashMap<String, f64> {
    let content: Vec<(&String, &TermStats)> = stats.iter().filter(|(t, _)| !is_noise(t)).collect();
    if content.is_empty() {
        return HashMap::new();
    }
    let tfs: Vec<f64> = content.iter().map(|(_, s)| s.tf as f64).collect();
    let mean = tfs.iter().sum::<f64>() / tfs.len() as f64;
    let std = (tfs.iter().map(|tf| (tf - mean).powi(2)).sum::<f64>() / tfs.len() as f64).sqrt();
    let max_tf = tfs.iter().copied().fold(1.0f64, f64::max);
    let sentence_count = sentence_count.max(1) as f64;

    content
        .into_iter()
        .map(|(term, s)| {
            let tf = s.tf as f64;
            let casing = s.tf_upper.max(s.tf_capital) as f64 / (1.0 + tf.ln());
            let position = (3.0 + median(&s.sentence_hits)).ln().ln();
            let frequency = tf / (mean + std);
            let relatedness = 1.0 + (s.left.len() as f64 / tf + s.right.len() as f64 / tf) * tf / max_tf;
            let spread = s.sentences.len() as f64 / sentence_count;
            let weight = position * relatedness
                / (casing + frequency / relatedness + spread / relatedness);
            (term.clone(), weight)
        })
        .collect()
}

fn median(values: &[usize]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

/// Normalised edit similarity in `[0, 1]`.
fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    1.0 - prev[b.len()] as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_content_words_not_stop_words() {
        let kws = extract_keywords("Fix the authentication token refresh in the login handler.", 10);
        assert!(!kws.is_empty());
        assert!(kws.len() <= 10);
        for kw in &kws {
            assert_eq!(kw, &kw.to_lowercase());
            let first = kw.split(' ').next().unwrap();
            let last = kw.split(' ').last().unwrap();
            assert!(!is_stop_word(first) && !is_stop_word(last), "{kw}");
        }
        assert!(kws.iter().any(|k| k.contains("authentication")));
    }

    #[test]
    fn test_respects_the_cap_and_is_deterministic() {
        let prompt = "Parser errors in the lexer. The lexer drops tokens. Tokens need spans for errors.";
        let a = extract_keywords(prompt, 3);
        let b = extract_keywords(prompt, 3);
        assert_eq!(a.len(), 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_results_are_unique() {
        let kws = extract_keywords("cache cache cache. Cache invalidation of the cache layer.", 10);
        let unique: HashSet<_> = kws.iter().collect();
        assert_eq!(unique.len(), kws.len());
    }

    #[test]
    fn test_falls_back_to_first_distinct_words() {
        assert_eq!(extract_keywords("the and of the", 2), vec!["the", "and"]);
    }

    #[test]
    fn test_zero_cap_yields_nothing() {
        assert!(extract_keywords("database migration", 0).is_empty());
    }

    #[test]
    fn test_edit_similarity() {
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert!(similarity_ratio("token", "tokens") > 0.8);
        assert!(similarity_ratio("auth", "database") < 0.5);
    }
}
