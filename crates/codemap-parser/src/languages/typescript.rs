// ABOUTME: TypeScript language profile
// ABOUTME: JavaScript extraction plus TypeScript-first module resolution and builtins

use codemap_core::FunctionDef;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

use super::javascript::{self, module_imports, resolve_module, script_calls, script_functions};
use crate::profile::LanguageProfile;

static BUILTINS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut names = javascript::BUILTINS.to_vec();
    names.extend_from_slice(&[
        "Record", "Partial", "Readonly", "Required", "Pick", "Omit", "ReturnType", "Awaited",
    ]);
    names
});

const TS_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts", ".js", ".jsx"];
const TS_INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.js", "index.jsx"];

pub struct TypeScriptProfile;

impl LanguageProfile for TypeScriptProfile {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        module_imports(text)
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        script_functions(text)
    }

    fn extract_function_calls(&self, body: &str) -> Vec<String> {
        script_calls(body, &BUILTINS)
    }

    fn resolve_import_path(
        &self,
        import: &str,
        current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        resolve_module(import, current_file, base, TS_EXTENSIONS, TS_INDEX_FILES)
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        javascript::script_line_number(text, name)
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS.as_slice()
    }
}
