//! Greedy word-budget packing of ranked records.
//!
//! Records are taken strictly in rank order. A record that fits whole is
//! included; the first one that does not fit is truncated at a word
//! boundary if its header still fits, and packing stops there. Everything
//! after that point is excluded. Records are never reordered to fill gaps.

use serde::Serialize;

use crate::models::{approximate_word_count, FileRecord, PackStatus};

/// Appended to truncated content; not counted against the budget.
pub const TRUNCATION_MARKER: &str = " ... (truncated)";

/// Block header for a record.
pub fn header(record: &FileRecord) -> String {
    format!(
        "--- FILE: {} (Relevance: {:.2}) ---",
        record.relative_path, record.relevance_score
    )
}

/// One record's place in the packed output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackedBlock {
    pub relative_path: String,
    pub header: String,
    /// Empty for excluded blocks.
    pub content: String,
    pub status: PackStatus,
    pub header_words: usize,
    pub content_words: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackedOutput {
    pub blocks: Vec<PackedBlock>,
    /// Header and content words of included and partial blocks.
    pub total_words: usize,
    pub budget: usize,
}

impl PackedOutput {
    /// Included and partial blocks as text, separated by blank lines.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.status != PackStatus::Excluded)
            .map(|b| format!("{}\n{}", b.header, b.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn count(&self, status: PackStatus) -> usize {
        self.blocks.iter().filter(|b| b.status == status).count()
    }
}

/// Pack `records` (already ranked) into at most `budget` words, recording
/// the outcome on each record's `packing` field.
pub fn pack(records: &mut [FileRecord], budget: usize) -> PackedOutput {
    let mut out = PackedOutput {
        budget,
        ..PackedOutput::default()
    };
    let mut stopped = false;

    for record in records.iter_mut() {
        let header = header(record);
        let header_words = approximate_word_count(&header);
        let content = record.content.as_deref().unwrap_or("");
        let content_words = approximate_word_count(content);
        let used = out.total_words;

        let (status, text, words) = if stopped {
            (PackStatus::Excluded, String::new(), 0)
        } else if used + header_words + content_words <= budget {
            (PackStatus::Included, content.to_string(), content_words)
        } else if used + header_words < budget {
            stopped = true;
            let remaining = budget - used - header_words;
            let kept = truncate_words(content, remaining);
            let text = format!("{kept}{TRUNCATION_MARKER}");
            (PackStatus::Partial, text, approximate_word_count(kept))
        } else {
            stopped = true;
            (PackStatus::Excluded, String::new(), 0)
        };

        if status != PackStatus::Excluded {
            out.total_words += header_words + words;
        }
        record.packing = Some(status);
        out.blocks.push(PackedBlock {
            relative_path: record.relative_path.clone(),
            header,
            content: text,
            status,
            header_words,
            content_words: words,
        });
    }
    out
}

/// The prefix of `text` holding its first `n` words, original spacing kept.
pub fn truncate_words(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.split_whitespace().nth(n - 1) {
        Some(word) => {
            let end = word.as_ptr() as usize - text.as_ptr() as usize + word.len();
            &text[..end]
        }
        None => text.trim_end(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileStatus;

    fn record(path: &str, words: usize) -> FileRecord {
        let mut r = FileRecord::identity(format!("/r/{path}"), path, FileStatus::Included);
        r.content = Some(vec!["word"; words].join(" "));
        r.relevance_score = 0.5;
        r
    }

    #[test]
    fn test_header_format() {
        let r = record("src/lib.rs", 1);
        assert_eq!(header(&r), "--- FILE: src/lib.rs (Relevance: 0.50) ---");
        assert_eq!(approximate_word_count(&header(&r)), 6);
    }

    #[test]
    fn test_second_file_is_truncated_and_packing_stops() {
        let mut records = vec![record("a.txt", 80), record("b.txt", 80), record("c.txt", 1)];
        let out = pack(&mut records, 100);

        assert_eq!(out.blocks[0].status, PackStatus::Included);
        assert_eq!(out.blocks[1].status, PackStatus::Partial);
        assert_eq!(out.blocks[1].content_words, 100 - 86 - 6);
        assert!(out.blocks[1].content.ends_with(TRUNCATION_MARKER));
        assert_eq!(out.blocks[2].status, PackStatus::Excluded);
        assert_eq!(out.total_words, 100);
        assert_eq!(records[2].packing, Some(PackStatus::Excluded));
        assert_eq!(out.count(PackStatus::Partial), 1);
    }

    #[test]
    fn test_header_that_cannot_fit_excludes_the_rest() {
        let mut records = vec![record("a.txt", 10), record("b.txt", 1), record("c.txt", 1)];
        let out = pack(&mut records, 20);
        // 16 used, 16 + 6 >= 20
        assert_eq!(out.blocks[0].status, PackStatus::Included);
        assert_eq!(out.blocks[1].status, PackStatus::Excluded);
        assert_eq!(out.blocks[2].status, PackStatus::Excluded);
        assert_eq!(out.total_words, 16);
    }

    #[test]
    fn test_budget_invariants_hold() {
        for budget in [0, 5, 6, 7, 30, 55, 1000] {
            let mut records = vec![record("a", 20), record("b", 3), record("c", 40), record("d", 0)];
            let out = pack(&mut records, budget);
            assert!(out.total_words <= budget, "budget {budget}");
            assert!(out.count(PackStatus::Partial) <= 1);
            let first_stop = out.blocks.iter().position(|b| b.status != PackStatus::Included);
            if let Some(i) = first_stop {
                assert!(out.blocks[i + 1..].iter().all(|b| b.status == PackStatus::Excluded));
            }
        }
    }

    #[test]
    fn test_text_joins_included_blocks() {
        let mut records = vec![record("a", 2), record("b", 2)];
        let out = pack(&mut records, 1000);
        assert_eq!(
            out.text(),
            "--- FILE: a (Relevance: 0.50) ---\nword word\n\n--- FILE: b (Relevance: 0.50) ---\nword word"
        );
    }

    #[test]
    fn test_truncation_keeps_original_spacing() {
        assert_eq!(truncate_words("fn  main()\n{ body }", 2), "fn  main()");
        assert_eq!(truncate_words("one two", 5), "one two");
        assert_eq!(truncate_words("one", 0), "");
    }
}
