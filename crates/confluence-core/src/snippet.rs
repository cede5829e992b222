//! Short excerpts shown in the report next to each processed file.

use std::collections::BTreeSet;

pub const SNIPPET_MAX_LINES: usize = 10;
pub const SNIPPET_MAX_LINE_CHARS: usize = 120;

/// Lines of context kept on each side of a keyword hit.
const CONTEXT: usize = SNIPPET_MAX_LINES / 4;

/// Excerpt of `text`: lines around keyword hits when `is_hit` matches any
/// line, else the first lines of the file. Long lines are shortened with
/// `...`.
pub fn snippet(text: &str, is_hit: impl Fn(&str) -> bool) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let mut picked: BTreeSet<usize> = BTreeSet::new();
    for (idx, line) in lines.iter().enumerate() {
        if picked.len() >= SNIPPET_MAX_LINES * 2 {
            break;
        }
        if is_hit(line) {
            let start = idx.saturating_sub(CONTEXT);
            let end = (idx + CONTEXT + 1).min(lines.len());
            picked.extend(start..end);
        }
    }

    let chosen: Vec<&str> = if picked.is_empty() {
        lines.iter().take(SNIPPET_MAX_LINES).copied().collect()
    } else {
        picked.into_iter().take(SNIPPET_MAX_LINES).map(|i| lines[i]).collect()
    };

    chosen
        .into_iter()
        .map(shorten)
        .collect::<Vec<_>>()
        .join("\n")
}

fn shorten(line: &str) -> String {
    if line.chars().count() > SNIPPET_MAX_LINE_CHARS {
        let cut: String = line.chars().take(SNIPPET_MAX_LINE_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_lines_without_hits() {
        let text = (1..=20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let s = snippet(&text, |_| false);
        assert_eq!(s.lines().count(), SNIPPET_MAX_LINES);
        assert!(s.starts_with("line 1\n"));
    }

    #[test]
    fn test_context_around_hits() {
        let text = (1..=20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let s = snippet(&text, |l| l == "line 10");
        assert_eq!(s, "line 8\nline 9\nline 10\nline 11\nline 12");
    }

    #[test]
    fn test_long_lines_are_shortened() {
        let long = "x".repeat(200);
        let s = snippet(&long, |_| false);
        assert_eq!(s.chars().count(), SNIPPET_MAX_LINE_CHARS);
        assert!(s.ends_with("..."));
    }

    #[test]
    fn test_empty_text_has_empty_snippet() {
        assert_eq!(snippet("", |_| true), "");
    }
}
