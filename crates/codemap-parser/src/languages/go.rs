// ABOUTME: Go language profile
// ABOUTME: Import blocks, func and method declarations, package-directory import resolution

use codemap_core::FunctionDef;
use std::path::{Path, PathBuf};

use super::declarations;
use crate::profile::LanguageProfile;
use crate::scan::{
    self, blank_non_code, collect_calls, dir_for_segments, name_pattern, pattern, push_unique,
    BraceIndex, Syntax,
};

pattern!(SINGLE_IMPORT, r#"(?m)^\s*import\s+(?:[A-Za-z_.][\w]*\s+)?"([^"]+)""#);
pattern!(IMPORT_BLOCK, r"(?m)^\s*import\s*\(([^)]*)\)");
pattern!(
    FUNC_DECL,
    r"(?m)^func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)\s*(?:\[[^\]]*\]\s*)?\("
);
pattern!(CALL, r"([A-Za-z_][\w.]*)\s*\(");

const BUILTINS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make", "max",
    "min", "new", "panic", "print", "println", "real", "recover", "string", "int", "int32",
    "int64", "uint", "uint8", "uint32", "uint64", "float32", "float64", "byte", "rune", "bool",
    "error",
];

pub struct GoProfile;

impl LanguageProfile for GoProfile {
    fn name(&self) -> &'static str {
        "go"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        let code = strip_line_comments(text);
        let mut found: Vec<(usize, String)> = Vec::new();

        for caps in SINGLE_IMPORT.captures_iter(&code) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str().to_string()));
            }
        }
        for caps in IMPORT_BLOCK.captures_iter(&code) {
            let Some(block) = caps.get(1) else { continue };
            let mut offset = block.start();
            for line in block.as_str().split_inclusive('\n') {
                // `alias "path"`, `_ "path"`, `. "path"` or plain `"path"`
                if let Some(path) = line.split_whitespace().last() {
                    let path = path.trim_matches('"');
                    if !path.is_empty() {
                        found.push((offset, path.to_string()));
                    }
                }
                offset += line.len();
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        let mut imports = Vec::new();
        for (_, path) in found {
            push_unique(&mut imports, &path);
        }
        imports
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        let code = blank_non_code(text, Syntax::GO);
        let index = BraceIndex::new(&code, Syntax::GO);
        declarations(&code, &index, &FUNC_DECL, 0..code.len(), Some(0), Syntax::GO)
            .into_iter()
            .map(|decl| FunctionDef::new(decl.name.clone(), decl.body_text(text)))
            .collect()
    }

    fn extract_function_calls(&self, body: &str) -> Vec<String> {
        collect_calls(body, &CALL, Syntax::GO, BUILTINS)
    }

    fn resolve_import_path(
        &self,
        import: &str,
        current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        if import.starts_with("./") || import.starts_with("../") {
            let dir = current_file.parent()?;
            return scan::existing_dir(dir.join(import));
        }
        // Anything that is not a directory of this tree is stdlib or an external module.
        let segments: Vec<&str> = import.split('/').collect();
        dir_for_segments(base, &segments)
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        let re = name_pattern(r"^\s*func\s+(?:\([^)]*\)\s*)?{}\s*[\[(]", name)?;
        scan::find_line(text, &re)
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

/// Removes `//` comments while leaving import string literals intact.
fn strip_line_comments(text: &str) -> String {
    text.lines()
        .map(|line| match line.find("//") {
            Some(pos) if !line[..pos].contains('"') => &line[..pos],
            _ => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = r#"package main

import "fmt"
import (
    "os"
    str "strings"
    // "commented/out"
    "example.com/app/pkgb"
)

type Server struct{}

func (s *Server) Start(port int) error {
    if err := listen(port); err != nil {
        return err
    }
    fmt.Println("started {")
    return nil
}

func Map[T any](xs []T, f func(T) T) []T {
    out := make([]T, 0, len(xs))
    for _, x := range xs {
        out = append(out, f(x))
    }
    return out
}

func listen(port int) error { return nil }
"#;

    #[test]
    fn extracts_single_and_block_imports_in_order() {
        let imports = GoProfile.extract_imports(SOURCE);
        assert_eq!(imports, vec!["fmt", "os", "strings", "example.com/app/pkgb"]);
    }

    #[test]
    fn extracts_functions_and_methods_with_bodies() {
        let functions = GoProfile.extract_functions(SOURCE);
        let names: Vec<_> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Start", "Map", "listen"]);
        assert!(functions[0].body.contains("fmt.Println(\"started {\")"));
        assert!(functions[0].body.trim_end().ends_with("return nil"));
    }

    #[test]
    fn calls_skip_builtins_and_keywords() {
        let functions = GoProfile.extract_functions(SOURCE);
        let calls = GoProfile.extract_function_calls(&functions[0].body);
        assert_eq!(calls, vec!["listen", "fmt.Println"]);
        let calls = GoProfile.extract_function_calls(&functions[1].body);
        assert_eq!(calls, vec!["f"]);
    }

    #[test]
    fn line_numbers_are_one_based() {
        assert_eq!(GoProfile.function_line_number(SOURCE, "Start"), Some(13));
        assert_eq!(GoProfile.function_line_number(SOURCE, "Map"), Some(21));
        assert_eq!(GoProfile.function_line_number(SOURCE, "Missing"), None);
    }

    #[test]
    fn resolves_package_directories() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("pkgb")).unwrap();
        fs::create_dir_all(base.join("internal/util")).unwrap();
        let current = base.join("main.go");

        assert_eq!(
            GoProfile.resolve_import_path("pkgb", &current, base),
            Some(base.join("pkgb"))
        );
        assert_eq!(
            GoProfile.resolve_import_path("example.com/app/internal/util", &current, base),
            Some(base.join("internal/util"))
        );
        assert_eq!(
            GoProfile.resolve_import_path("./pkgb", &current, base),
            Some(base.join("./pkgb"))
        );
        assert_eq!(GoProfile.resolve_import_path("fmt", &current, base), None);
    }
}
