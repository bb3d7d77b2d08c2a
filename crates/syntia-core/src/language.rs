// ABOUTME: Language tags attached to open buffers.
// ABOUTME: Detects a buffer's language from its extension or shebang line.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    Python,
    Markdown,
    JavaScript,
    TypeScript,
    Json,
    Html,
    Css,
    Toml,
    Rust,
    Shell,
    #[default]
    PlainText,
}

impl Language {
    /// Tag handed to the highlighting engine
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Markdown => "markdown",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Json => "json",
            Language::Html => "html",
            Language::Css => "css",
            Language::Toml => "toml",
            Language::Rust => "rust",
            Language::Shell => "bash",
            Language::PlainText => "text",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Language> {
        let lang = match ext.to_ascii_lowercase().as_str() {
            "py" | "pyi" => Language::Python,
            "md" | "markdown" => Language::Markdown,
            "js" | "jsx" | "mjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "json" => Language::Json,
            "html" | "htm" => Language::Html,
            "css" => Language::Css,
            "toml" => Language::Toml,
            "rs" => Language::Rust,
            "sh" | "bash" => Language::Shell,
            _ => return None,
        };
        Some(lang)
    }

    fn from_shebang(first_line: &str) -> Option<Language> {
        let interpreter = first_line.strip_prefix("#!")?;
        if interpreter.contains("python") {
            Some(Language::Python)
        } else if interpreter.contains("node") {
            Some(Language::JavaScript)
        } else if interpreter.contains("sh") {
            Some(Language::Shell)
        } else {
            None
        }
    }

    pub fn is_markdown(&self) -> bool {
        matches!(self, Language::Markdown)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Maps a file to its language tag. Must be pure.
pub trait LanguageDetector: Send {
    fn detect(&self, path: &Path, content: &str) -> Language;
}

/// Extension table first, then the shebang line, then plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionDetector;

impl LanguageDetector for ExtensionDetector {
    fn detect(&self, path: &Path, content: &str) -> Language {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
            .or_else(|| content.lines().next().and_then(Language::from_shebang))
            .unwrap_or_default()
    }
}
