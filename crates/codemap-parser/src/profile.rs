// ABOUTME: Language profile capability and extension-based dispatch
// ABOUTME: Every extension maps to a profile; unknown ones get the generic fallback

use codemap_core::FunctionDef;
use std::path::{Path, PathBuf};

use crate::languages::{
    CSharpProfile, CppProfile, GenericProfile, GoProfile, JavaProfile, JavaScriptProfile,
    PhpProfile, PythonProfile, RubyProfile, TypeScriptProfile,
};

/// Best-effort lexical extraction for one language.
///
/// No operation fails: malformed or unrecognized input yields empty results or `None`.
/// False positives and misses are expected, since nothing here is a real parser.
pub trait LanguageProfile: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw import specifiers in source order, without duplicates.
    fn extract_imports(&self, text: &str) -> Vec<String>;

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef>;

    /// Names called from `body`, builtins excluded.
    fn extract_function_calls(&self, body: &str) -> Vec<String>;

    /// Local path an import refers to, or `None` for standard-library and external imports.
    /// The result may be a directory when the language imports whole packages.
    fn resolve_import_path(&self, import: &str, current_file: &Path, base: &Path)
        -> Option<PathBuf>;

    /// 1-based line of the declaration of `name`.
    fn function_line_number(&self, text: &str, name: &str) -> Option<usize>;

    /// Call names this profile never reports.
    fn builtins(&self) -> &'static [&'static str];
}

pub fn profile_for_extension(ext: &str) -> &'static dyn LanguageProfile {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "go" => &GoProfile,
        "js" | "jsx" | "mjs" | "cjs" => &JavaScriptProfile,
        "ts" | "tsx" => &TypeScriptProfile,
        "py" => &PythonProfile,
        "java" => &JavaProfile,
        "c" | "cpp" | "cc" | "cxx" | "h" | "hpp" => &CppProfile,
        "cs" => &CSharpProfile,
        "rb" => &RubyProfile,
        "php" => &PhpProfile,
        _ => &GenericProfile,
    }
}

pub fn profile_for_path(path: &Path) -> &'static dyn LanguageProfile {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    profile_for_extension(ext)
}
