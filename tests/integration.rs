use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn confluence_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("confluence");
    path
}

fn setup_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");
    fs::create_dir_all(project.join("src")).unwrap();
    fs::create_dir_all(project.join("target/debug")).unwrap();

    fs::write(
        project.join("src/cache.rs"),
        "// LRU cache\npub fn invalidate_cache(key: &str) {\n    cache.remove(key);\n}\n",
    )
    .unwrap();
    fs::write(
        project.join("src/render.rs"),
        "pub fn draw_frame() {\n    canvas.clear();\n}\n",
    )
    .unwrap();
    fs::write(project.join("README.md"), "# Project\n").unwrap();
    fs::write(project.join("target/debug/build.rs"), "fn main() {}\n").unwrap();
    tmp
}

/// Runs the binary with `cwd` as working directory.
fn run_confluence(cwd: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = confluence_binary();
    let output = Command::new(&binary)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run confluence binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn read_report(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_run_without_prompt_writes_both_outputs() {
    let tmp = setup_project();
    let (stdout, stderr, ok) = run_confluence(tmp.path(), &["run", "project", "--progress", "off"]);
    assert!(ok, "stderr: {stderr}");
    assert!(stdout.contains("2 files in context"), "stdout: {stdout}");

    let report = read_report(&tmp.path().join("confluence_output.json"));
    assert_eq!(report["in_context"][0]["relative_path"], "src/cache.rs");
    assert_eq!(report["in_context"][1]["relative_path"], "src/render.rs");
    assert_eq!(report["summary"]["status_counts"]["ignored_directory"], 1);
    assert_eq!(report["summary"]["status_counts"]["no_matching_rule"], 1);

    let flat = fs::read_to_string(tmp.path().join("confluence_output.txt")).unwrap();
    assert!(flat.starts_with("--- FILE: src/cache.rs (Relevance: 0.00) ---\n// LRU cache\n"));
}

#[test]
fn test_run_with_prompt_filters_and_ranks() {
    let tmp = setup_project();
    let (_, stderr, ok) = run_confluence(
        tmp.path(),
        &[
            "run",
            "project",
            "--prompt",
            "How do we invalidate the cache?",
            "--output-json",
            "out/report.json",
            "--output-flat",
            "out/context.txt",
            "--template",
            "--strip-comments",
            "--workers",
            "2",
        ],
    );
    assert!(ok, "stderr: {stderr}");

    let report = read_report(&tmp.path().join("out/report.json"));
    let in_context = report["in_context"].as_array().unwrap();
    assert_eq!(in_context.len(), 1);
    assert_eq!(in_context[0]["relative_path"], "src/cache.rs");
    assert_eq!(in_context[0]["rank"], 1);
    assert_eq!(report["summary"]["workers"], 2);
    assert_eq!(report["summary"]["status_counts"]["processed_below_threshold"], 1);

    let flat = fs::read_to_string(tmp.path().join("out/context.txt")).unwrap();
    assert!(flat.starts_with("LLM Context Aggregation\n"));
    assert!(flat.contains("How do we invalidate the cache?"));
    assert!(flat.contains("--- FILE: src/cache.rs (Relevance: "));
    assert!(!flat.contains("LRU"));
}

#[test]
fn test_prompt_file_and_config_file() {
    let tmp = setup_project();
    fs::write(tmp.path().join("task.md"), "draw the frame on the canvas\n").unwrap();
    fs::write(
        tmp.path().join("confluence.toml"),
        "[filters]\npreset = \"all_text\"\n\n[output]\njson = \"r.json\"\nflat = \"r.txt\"\n",
    )
    .unwrap();

    let (_, stderr, ok) = run_confluence(
        tmp.path(),
        &["run", "project", "--prompt-file", "task.md", "--progress", "json"],
    );
    assert!(ok, "stderr: {stderr}");
    assert!(stderr.contains("\"phase\":\"packed\""), "stderr: {stderr}");

    let report = read_report(&tmp.path().join("r.json"));
    assert_eq!(report["summary"]["settings"]["filters"]["preset"], "all_text");
    assert_eq!(report["in_context"][0]["relative_path"], "src/render.rs");
}

#[test]
fn test_missing_directory_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, ok) = run_confluence(tmp.path(), &["run", "does-not-exist"]);
    assert!(!ok);
    assert!(stderr.contains("Not a directory"), "stderr: {stderr}");
}

#[test]
fn test_stop_word_prompt_fails() {
    let tmp = setup_project();
    let (_, stderr, ok) = run_confluence(tmp.path(), &["run", "project", "--prompt", "the and of"]);
    assert!(!ok);
    assert!(stderr.contains("empty vocabulary"), "stderr: {stderr}");
    assert!(!tmp.path().join("confluence_output.json").exists());
}

#[test]
fn test_invalid_threshold_fails() {
    let tmp = setup_project();
    let (_, stderr, ok) = run_confluence(
        tmp.path(),
        &["run", "project", "--similarity-threshold", "2"],
    );
    assert!(!ok);
    assert!(stderr.contains("similarity_threshold"), "stderr: {stderr}");
}

#[test]
fn test_presets_lists_all() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, ok) = run_confluence(tmp.path(), &["presets"]);
    assert!(ok);
    assert!(stdout.contains("code"));
    assert!(stdout.contains("docs"));
    assert!(stdout.contains("all_text"));
    assert!(stdout.contains(".rs"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, ok) = run_confluence(tmp.path(), &["completions", "bash"]);
    assert!(ok);
    assert!(stdout.contains("confluence"));
}
