use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Extensions (without the leading dot) that take part in dependency analysis and indexing.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "go", "py", "js", "jsx", "ts", "tsx", "java", "c", "cpp", "h", "hpp", "cs", "rb", "php",
];

pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');
    SUPPORTED_EXTENSIONS.contains(&ext)
}

pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(is_supported_extension)
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    JavaScript,
    TypeScript,
    Python,
    Java,
    C,
    Cpp,
    #[serde(rename = "cpp_header")]
    CppHeader,
    CSharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Rust,
    Scala,
    Html,
    Css,
    Markdown,
    Json,
    Yaml,
    Xml,
    Sql,
    Shell,
    PowerShell,
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "go" => Language::Go,
            "js" | "jsx" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "py" => Language::Python,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" | "cc" | "cxx" => Language::Cpp,
            "h" | "hpp" => Language::CppHeader,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            "rs" => Language::Rust,
            "scala" => Language::Scala,
            "html" | "htm" => Language::Html,
            "css" => Language::Css,
            "md" | "markdown" => Language::Markdown,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "xml" => Language::Xml,
            "sql" => Language::Sql,
            "sh" | "bash" => Language::Shell,
            "ps1" => Language::PowerShell,
            _ => Language::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Stable lowercase tag stored in chunk metadata.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CppHeader => "cpp_header",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Rust => "rust",
            Language::Scala => "scala",
            Language::Html => "html",
            Language::Css => "css",
            Language::Markdown => "markdown",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Xml => "xml",
            Language::Sql => "sql",
            Language::Shell => "shell",
            Language::PowerShell => "powershell",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
