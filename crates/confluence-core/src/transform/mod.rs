//! Content transforms: comment stripping and whitespace minification.
//!
//! Both transforms are optional and independent. When stripping is enabled
//! it runs first; minification (if enabled) then runs over the stripped
//! text. Transforms never fail from the caller's point of view: if a
//! language-specific stripper cannot make sense of the input, the original
//! text is returned unchanged.
//!
//! Every transform is idempotent: applying the same options to an already
//! transformed text yields the same text.

mod python;

pub use python::TokenizeError;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::language::{Language, SyntaxFamily};

static C_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("valid C comment pattern"));
static HASH_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[^\n]*").expect("valid hash comment pattern"));
static MARKUP_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid markup comment pattern"));

/// Which transforms to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    pub minify_whitespace: bool,
    pub strip_comments: bool,
}

impl TransformOptions {
    pub fn is_noop(&self) -> bool {
        !self.minify_whitespace && !self.strip_comments
    }
}

/// Apply the enabled transforms to `text`, falling back to the original
/// text if stripping fails.
pub fn transform(text: &str, language: Language, options: TransformOptions) -> String {
    if options.is_noop() {
        return text.to_string();
    }

    let mut out = if options.strip_comments {
        match strip_comments(text, language) {
            Ok(stripped) if options.minify_whitespace => stripped,
            Ok(stripped) => tidy_stripped(text, &stripped),
            Err(e) => {
                debug!(language = %language, error = %e, "comment stripping failed, keeping original text");
                return text.to_string();
            }
        }
    } else {
        text.to_string()
    };

    if options.minify_whitespace {
        out = minify_whitespace(&out);
    }
    out
}

/// Remove comments according to the language's syntax family.
///
/// Removed spans keep their line breaks, so the result has the same number
/// of lines as the input. Languages without a known comment syntax pass
/// through unchanged.
pub fn strip_comments(text: &str, language: Language) -> Result<String, TokenizeError> {
    match language.syntax_family() {
        SyntaxFamily::CFamily => Ok(mask(text, &C_COMMENT)),
        SyntaxFamily::Hash => Ok(mask(text, &HASH_COMMENT)),
        SyntaxFamily::Markup => Ok(mask(text, &MARKUP_COMMENT)),
        SyntaxFamily::Python => python::strip(text),
        SyntaxFamily::Unknown => Ok(text.to_string()),
    }
}

fn mask(text: &str, pattern: &Regex) -> String {
    pattern
        .replace_all(text, |caps: &Captures| {
            caps[0].chars().filter(|&c| c == '\n').collect::<String>()
        })
        .into_owned()
}

/// Clean up after stripping when minification is off.
///
/// Untouched lines are kept verbatim. A line that lost a trailing comment is
/// right-trimmed. A line emptied by stripping survives as an empty line only
/// when both neighbours are non-blank; otherwise it is dropped.
fn tidy_stripped(original: &str, stripped: &str) -> String {
    let before: Vec<&str> = original.split('\n').collect();
    let after: Vec<&str> = stripped.split('\n').collect();
    if before.len() != after.len() {
        return stripped.to_string();
    }

    let blank = |line: &str| line.trim().is_empty();
    let mut out: Vec<&str> = Vec::with_capacity(after.len());
    for (i, (orig, line)) in before.iter().zip(after.iter()).enumerate() {
        if orig == line {
            out.push(line);
        } else if !blank(line) {
            out.push(line.trim_end());
        } else {
            let prev_solid = i > 0 && !blank(after[i - 1]);
            let next_solid = i + 1 < after.len() && !blank(after[i + 1]);
            if prev_solid && next_solid {
                out.push("");
            }
        }
    }
    out.join("\n")
}

/// Right-trim every line, collapse runs of blank lines to one, and drop
/// leading and trailing blank lines.
pub fn minify_whitespace(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut prev_blank = true;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !prev_blank {
                out.push("");
            }
            prev_blank = true;
        } else {
            out.push(line);
            prev_blank = false;
        }
    }
    while out.last() == Some(&"") {
        out.pop();
    }
    out.join("\n")
}
