//! Language tags and the comment-syntax family each one belongs to.
//!
//! Detection is purely name-based (extension, then a handful of well-known
//! file names). The tag drives comment stripping in [`crate::transform`] and
//! is reported on every [`crate::models::FileRecord`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Detected language of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Rust,
    C,
    Cpp,
    #[serde(rename = "csharp")]
    CSharp,
    Java,
    Kotlin,
    Scala,
    Groovy,
    Swift,
    Go,
    Dart,
    #[serde(rename = "javascript")]
    JavaScript,
    #[serde(rename = "typescript")]
    TypeScript,
    Php,
    Css,
    Shell,
    #[serde(rename = "powershell")]
    PowerShell,
    Ruby,
    Perl,
    R,
    Yaml,
    Toml,
    Ini,
    Terraform,
    Make,
    Docker,
    #[serde(rename = "cmake")]
    CMake,
    Html,
    Xml,
    Markdown,
    Json,
    Sql,
    Lua,
    Text,
    Unknown,
}

/// Comment syntax family, the closed set comment stripping dispatches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxFamily {
    /// `// line` and `/* block */` comments.
    CFamily,
    /// `# line` comments.
    Hash,
    /// `<!-- ... -->` comments.
    Markup,
    /// Tokenizer-driven stripping of `#` comments and docstrings.
    Python,
    /// No known comment syntax; stripping is a no-op.
    Unknown,
}

impl Language {
    /// Detect the language from a file name such as `main.rs` or `Makefile`.
    pub fn detect(file_name: &str) -> Language {
        let lower = file_name.to_lowercase();
        match lower.as_str() {
            "makefile" | "gnumakefile" => return Language::Make,
            "dockerfile" | "containerfile" => return Language::Docker,
            "cmakelists.txt" => return Language::CMake,
            "justfile" => return Language::Make,
            _ => {}
        }
        let ext = match lower.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext,
            _ => return Language::Unknown,
        };
        Self::from_extension(ext)
    }

    /// Map a lowercase extension (without the dot) to a language.
    pub fn from_extension(ext: &str) -> Language {
        match ext {
            "py" | "pyw" | "pyi" => Language::Python,
            "rs" => Language::Rust,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "scala" | "sc" => Language::Scala,
            "groovy" | "gradle" => Language::Groovy,
            "swift" => Language::Swift,
            "go" => Language::Go,
            "dart" => Language::Dart,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "php" => Language::Php,
            "css" | "scss" | "less" => Language::Css,
            "sh" | "bash" | "zsh" => Language::Shell,
            "ps1" | "psm1" => Language::PowerShell,
            "rb" => Language::Ruby,
            "pl" | "pm" => Language::Perl,
            "r" => Language::R,
            "yaml" | "yml" => Language::Yaml,
            "toml" => Language::Toml,
            "ini" | "cfg" | "conf" | "properties" => Language::Ini,
            "tf" | "hcl" => Language::Terraform,
            "mk" => Language::Make,
            "cmake" => Language::CMake,
            "html" | "htm" | "xhtml" | "vue" | "svelte" => Language::Html,
            "xml" | "xsd" | "xsl" | "plist" => Language::Xml,
            "md" | "markdown" => Language::Markdown,
            "json" | "jsonc" => Language::Json,
            "sql" => Language::Sql,
            "lua" => Language::Lua,
            "txt" | "rst" | "adoc" | "asciidoc" | "org" | "tex" | "csv" | "rtf" => Language::Text,
            _ => Language::Unknown,
        }
    }

    /// Comment syntax family used for stripping.
    pub fn syntax_family(self) -> SyntaxFamily {
        match self {
            Language::Python => SyntaxFamily::Python,
            Language::Rust
            | Language::C
            | Language::Cpp
            | Language::CSharp
            | Language::Java
            | Language::Kotlin
            | Language::Scala
            | Language::Groovy
            | Language::Swift
            | Language::Go
            | Language::Dart
            | Language::JavaScript
            | Language::TypeScript
            | Language::Php
            | Language::Css => SyntaxFamily::CFamily,
            Language::Shell
            | Language::PowerShell
            | Language::Ruby
            | Language::Perl
            | Language::R
            | Language::Yaml
            | Language::Toml
            | Language::Ini
            | Language::Terraform
            | Language::Make
            | Language::Docker
            | Language::CMake => SyntaxFamily::Hash,
            Language::Html | Language::Xml | Language::Markdown => SyntaxFamily::Markup,
            Language::Json | Language::Sql | Language::Lua | Language::Text | Language::Unknown => {
                SyntaxFamily::Unknown
            }
        }
    }

    /// Stable lowercase tag, e.g. `"python"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Groovy => "groovy",
            Language::Swift => "swift",
            Language::Go => "go",
            Language::Dart => "dart",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Php => "php",
            Language::Css => "css",
            Language::Shell => "shell",
            Language::PowerShell => "powershell",
            Language::Ruby => "ruby",
            Language::Perl => "perl",
            Language::R => "r",
            Language::Yaml => "yaml",
            Language::Toml => "toml",
            Language::Ini => "ini",
            Language::Terraform => "terraform",
            Language::Make => "make",
            Language::Docker => "docker",
            Language::CMake => "cmake",
            Language::Html => "html",
            Language::Xml => "xml",
            Language::Markdown => "markdown",
            Language::Json => "json",
            Language::Sql => "sql",
            Language::Lua => "lua",
            Language::Text => "text",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_by_extension_case_insensitively() {
        assert_eq!(Language::detect("main.RS"), Language::Rust);
        assert_eq!(Language::detect("app.py"), Language::Python);
        assert_eq!(Language::detect("index.html"), Language::Html);
        assert_eq!(Language::detect("archive.tar.gz"), Language::Unknown);
    }

    #[test]
    fn test_detects_well_known_file_names() {
        assert_eq!(Language::detect("Makefile"), Language::Make);
        assert_eq!(Language::detect("Dockerfile"), Language::Docker);
        assert_eq!(Language::detect("CMakeLists.txt"), Language::CMake);
    }

    #[test]
    fn test_dotfiles_without_extension_are_unknown() {
        assert_eq!(Language::detect(".gitignore"), Language::Unknown);
        assert_eq!(Language::detect("README"), Language::Unknown);
    }

    #[test]
    fn test_families_cover_the_closed_set() {
        assert_eq!(Language::Go.syntax_family(), SyntaxFamily::CFamily);
        assert_eq!(Language::Yaml.syntax_family(), SyntaxFamily::Hash);
        assert_eq!(Language::Xml.syntax_family(), SyntaxFamily::Markup);
        assert_eq!(Language::Python.syntax_family(), SyntaxFamily::Python);
        assert_eq!(Language::Json.syntax_family(), SyntaxFamily::Unknown);
    }

    #[test]
    fn test_serde_tag_matches_as_str() {
        for lang in [Language::CSharp, Language::JavaScript, Language::PowerShell, Language::CMake] {
            let json = serde_json::to_string(&lang).unwrap();
            assert_eq!(json, format!("\"{}\"", lang.as_str()));
        }
    }
}
