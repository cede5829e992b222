//! Writing run results: the JSON report and the packed flat text.

use anyhow::{Context, Result};
use confluence_core::models::FileRecord;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::pipeline::{RunOutput, RunSummary};

const RULE: &str = "========================================";

/// Shape of the JSON report.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub summary: &'a RunSummary,
    /// Ranked records with their transformed content.
    pub in_context: &'a [FileRecord],
    /// Everything else, without content.
    pub cataloged_only: &'a [FileRecord],
}

impl<'a> Report<'a> {
    pub fn new(output: &'a RunOutput) -> Self {
        Report {
            summary: &output.summary,
            in_context: &output.ranked.in_context,
            cataloged_only: &output.ranked.cataloged_only,
        }
    }
}

pub fn write_json_report(path: &Path, output: &RunOutput) -> Result<()> {
    let json = serde_json::to_string_pretty(&Report::new(output))
        .with_context(|| "Failed to serialize report")?;
    write_with_parents(path, &json)
}

/// The packed text, optionally wrapped in the aggregation template.
pub fn render_flat(output: &RunOutput, template: bool) -> String {
    let body = output.packed.text();
    if !template {
        return body;
    }

    let s = &output.summary;
    let mut out = String::from("LLM Context Aggregation\n\n");
    if let Some(prompt) = s.prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        out.push_str("Preamble / Task Description:\n");
        out.push_str(prompt.trim_end());
        out.push_str("\n\n");
        out.push_str(&"-".repeat(40));
        out.push_str("\n\n");
    }

    out.push_str("Scan Information:\n");
    let fields = [
        ("Run Id", s.run_id.to_string()),
        ("Started At", s.started_at.to_rfc3339()),
        ("Root", s.root.clone()),
        ("Keywords", s.keywords.join(", ")),
        ("Files In Context", s.in_context.to_string()),
        ("Files Cataloged Only", s.cataloged_only.to_string()),
        ("Packed Words", format!("{} / {}", s.packed_words, output.packed.budget)),
    ];
    for (label, value) in fields {
        out.push_str(&format!("  {label}: {value}\n"));
    }
    out.push_str(&format!("\n{RULE}\nAggregated Files\n{RULE}\n\n"));
    out.push_str(&body);
    out
}

pub fn write_flat(path: &Path, text: &str) -> Result<()> {
    write_with_parents(path, text)
}

fn write_with_parents(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::run;
    use crate::progress::NoProgress;
    use tempfile::TempDir;

    fn sample_run(prompt: Option<&str>) -> (TempDir, RunOutput) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("cache.rs"), "fn cache_lookup() { cache hit }\n").unwrap();
        fs::write(tmp.path().join("image.png"), [0u8, 1, 2]).unwrap();
        let output = run(tmp.path(), prompt, &Config::default(), &NoProgress).unwrap();
        (tmp, output)
    }

    #[test]
    fn test_json_report_shape() {
        let (tmp, output) = sample_run(Some("cache lookup"));
        let path = tmp.path().join("out/report.json");
        write_json_report(&path, &output).unwrap();

        let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["summary"]["status_counts"]["included"], 1);
        assert_eq!(v["summary"]["status_counts"]["no_matching_rule"], 1);
        assert_eq!(v["in_context"][0]["relative_path"], "cache.rs");
        assert!(v["in_context"][0]["content"].is_string());
        assert_eq!(v["cataloged_only"][0]["relative_path"], "image.png");
        assert!(v["cataloged_only"][0].get("content").is_none());
    }

    #[test]
    fn test_template_wraps_packed_text() {
        let (_tmp, output) = sample_run(Some("cache lookup"));
        let plain = render_flat(&output, false);
        assert!(plain.starts_with("--- FILE: cache.rs (Relevance: "));

        let wrapped = render_flat(&output, true);
        assert!(wrapped.starts_with("LLM Context Aggregation\n\nPreamble / Task Description:\ncache lookup\n"));
        assert!(wrapped.contains("Scan Information:\n"));
        assert!(wrapped.ends_with(&plain));
    }

    #[test]
    fn test_template_without_prompt_has_no_preamble() {
        let (_tmp, output) = sample_run(None);
        let wrapped = render_flat(&output, true);
        assert!(!wrapped.contains("Preamble"));
        assert!(wrapped.contains("--- FILE: cache.rs (Relevance: 0.00) ---"));
    }
}
