// ABOUTME: Python language profile
// ABOUTME: Indentation-delimited function bodies, class methods, module and package resolution

use codemap_core::FunctionDef;
use std::path::{Path, PathBuf};

use crate::profile::LanguageProfile;
use crate::scan::{
    self, collect_calls, existing_file, indent_of, lines_with_offsets, name_pattern, pattern,
    push_unique, CodeBytes, Syntax,
};

pattern!(FROM_IMPORT, r"^\s*from\s+(\.*[\w.]*)\s+import\b");
pattern!(PLAIN_IMPORT, r"^\s*import\s+([^#]+)");
pattern!(DEF, r"^(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(");
pattern!(CLASS, r"^class\s+([A-Za-z_]\w*)");
pattern!(CALL, r"([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*)\s*\(");

const BUILTINS: &[&str] = &[
    "print", "len", "range", "enumerate", "zip", "map", "filter", "sorted", "reversed", "list",
    "dict", "set", "tuple", "str", "int", "float", "bool", "sum", "min", "max", "abs", "all",
    "any", "open", "input", "super", "isinstance", "issubclass", "hasattr", "getattr", "setattr",
    "type", "repr", "format", "iter", "next", "round", "id", "hash", "callable", "vars", "dir",
    "ord", "chr", "bytes", "object", "property", "staticmethod", "classmethod",
];

pub struct PythonProfile;

impl LanguageProfile for PythonProfile {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        let mut imports = Vec::new();
        for line in text.lines() {
            if let Some(caps) = FROM_IMPORT.captures(line) {
                if let Some(module) = caps.get(1).filter(|m| !m.as_str().is_empty()) {
                    push_unique(&mut imports, module.as_str());
                }
            } else if let Some(caps) = PLAIN_IMPORT.captures(line) {
                let Some(list) = caps.get(1) else { continue };
                // import a.b as c, d
                for item in list.as_str().split(',') {
                    if let Some(module) = item.split_whitespace().next() {
                        push_unique(&mut imports, module.trim_matches(['(', ')']));
                    }
                }
            }
        }
        imports
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        let lines = lines_with_offsets(text);
        let mut functions = Vec::new();
        let mut classes: Vec<(usize, String)> = Vec::new();
        let mut defs: Vec<usize> = Vec::new();

        for (idx, (offset, line)) in lines.iter().enumerate() {
            let stripped = line.trim_start();
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }
            let indent = indent_of(line);
            classes.retain(|(class_indent, _)| *class_indent < indent);
            defs.retain(|def_indent| *def_indent < indent);

            if let Some(caps) = CLASS.captures(stripped) {
                if defs.is_empty() {
                    if let Some(name) = caps.get(1) {
                        classes.push((indent, name.as_str().to_string()));
                    }
                }
                continue;
            }

            let Some(caps) = DEF.captures(stripped) else { continue };
            let Some(name) = caps.get(1) else { continue };
            let nested = !defs.is_empty();
            defs.push(indent);
            if nested {
                continue;
            }

            let name = match classes.last() {
                Some((_, class)) => format!("{}.{}", class, name.as_str()),
                None => name.as_str().to_string(),
            };
            let header_from = offset + (line.len() - stripped.len());
            let body = block_body(text, &lines, idx, header_from, indent);
            functions.push(FunctionDef::new(name, body));
        }
        functions
    }

    fn extract_function_calls(&self, body: &str) -> Vec<String> {
        collect_calls(body, &CALL, Syntax::SCRIPT, BUILTINS)
    }

    fn resolve_import_path(
        &self,
        import: &str,
        current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        let current_dir = current_file.parent()?;
        let dots = import.chars().take_while(|c| *c == '.').count();

        if dots > 0 {
            let mut dir = current_dir.to_path_buf();
            for _ in 1..dots {
                dir = dir.parent()?.to_path_buf();
            }
            let rest = &import[dots..];
            if rest.is_empty() {
                return existing_file(dir.join("__init__.py"));
            }
            return probe_module(&dir, rest);
        }

        probe_module(base, import).or_else(|| probe_module(current_dir, import))
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        if let Some((class, method)) = name.split_once('.') {
            let class_re = name_pattern(r"^\s*class\s+{}\b", class)?;
            let class_line = scan::find_line(text, &class_re)?;
            let method_re = name_pattern(r"^\s*(?:async\s+)?def\s+{}\s*\(", method)?;
            return scan::find_line_after(text, &method_re, class_line);
        }
        let top = name_pattern(r"^(?:async\s+)?def\s+{}\s*\(", name)?;
        let any = name_pattern(r"^\s*(?:async\s+)?def\s+{}\s*\(", name)?;
        scan::find_line(text, &top).or_else(|| scan::find_line(text, &any))
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

/// `a.b.c` as `a/b/c.py` or the package `a/b/c/__init__.py` under `dir`.
fn probe_module(dir: &Path, dotted: &str) -> Option<PathBuf> {
    let relative: PathBuf = dotted.split('.').filter(|s| !s.is_empty()).collect();
    if relative.as_os_str().is_empty() {
        return None;
    }
    existing_file(dir.join(&relative).with_extension("py"))
        .or_else(|| existing_file(dir.join(&relative).join("__init__.py")))
}

/// Text of the block opened by the header starting at `header_from` on line `idx`.
fn block_body(
    text: &str,
    lines: &[(usize, &str)],
    idx: usize,
    header_from: usize,
    indent: usize,
) -> String {
    let Some(colon) = header_colon(text, header_from) else {
        return String::new();
    };
    let colon_line = scan::line_of_offset(text, colon) - 1;

    // `def f(): return 1`
    let (line_offset, line) = lines.get(colon_line).copied().unwrap_or((0, ""));
    let inline = text
        .get(colon + 1..line_offset + line.len())
        .unwrap_or("")
        .trim();
    if !inline.is_empty() && !inline.starts_with('#') {
        return inline.to_string();
    }

    let first = colon_line.max(idx) + 1;
    let mut last = None;
    for (i, (_, line)) in lines.iter().enumerate().skip(first) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= indent {
            break;
        }
        last = Some(i);
    }

    match (lines.get(first), last.and_then(|l| lines.get(l))) {
        (Some((start, _)), Some((end_offset, end_line))) => text
            .get(*start..end_offset + end_line.len())
            .unwrap_or("")
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

/// Offset of the `:` ending a `def` header, parameter lists may span lines.
fn header_colon(text: &str, from: usize) -> Option<usize> {
    let mut nesting = 0i32;
    for (i, c) in CodeBytes::new(text, from, Syntax::SCRIPT) {
        match c {
            b'(' | b'[' | b'{' => nesting += 1,
            b')' | b']' | b'}' => nesting -= 1,
            b':' if nesting <= 0 => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = r#"import os, sys as system
from .models import User
from ..core.db import session
import json

def load(path: str) -> dict:
    """Read a file."""
    with open(path) as fh:
        data = parse(fh.read())

    return validate(data)

def quick(): return helper()

class Service(Base):
    def __init__(self, repo):
        self.repo = repo

    async def fetch(self,
                    key):
        def inner():
            return lookup(key)
        return self.repo.get(inner())

def parse(raw):
    return json.loads(raw)
"#;

    #[test]
    fn imports_keep_relative_dots() {
        let imports = PythonProfile.extract_imports(SOURCE);
        assert_eq!(imports, vec!["os", "sys", ".models", "..core.db", "json"]);
    }

    #[test]
    fn functions_and_methods() {
        let functions = PythonProfile.extract_functions(SOURCE);
        let names: Vec<_> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["load", "quick", "Service.__init__", "Service.fetch", "parse"]
        );
        assert!(functions[0].body.starts_with("\"\"\"Read a file.\"\"\""));
        assert!(functions[0].body.ends_with("return validate(data)"));
        assert_eq!(functions[1].body, "return helper()");
        assert!(functions[3].body.contains("return lookup(key)"));
    }

    #[test]
    fn calls_skip_builtins() {
        let functions = PythonProfile.extract_functions(SOURCE);
        let calls = PythonProfile.extract_function_calls(&functions[0].body);
        assert_eq!(calls, vec!["parse", "fh.read", "validate"]);
    }

    #[test]
    fn line_numbers() {
        assert_eq!(PythonProfile.function_line_number(SOURCE, "load"), Some(6));
        assert_eq!(
            PythonProfile.function_line_number(SOURCE, "Service.fetch"),
            Some(19)
        );
        assert_eq!(PythonProfile.function_line_number(SOURCE, "nope"), None);
    }

    #[test]
    fn resolves_modules_and_packages() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("app/core")).unwrap();
        fs::write(base.join("app/models.py"), "").unwrap();
        fs::write(base.join("app/core/__init__.py"), "").unwrap();
        fs::write(base.join("app/service.py"), "").unwrap();
        let current = base.join("app/service.py");

        assert_eq!(
            PythonProfile.resolve_import_path(".models", &current, base),
            Some(base.join("app/models.py"))
        );
        assert_eq!(
            PythonProfile.resolve_import_path("app.core", &current, base),
            Some(base.join("app/core/__init__.py"))
        );
        assert_eq!(PythonProfile.resolve_import_path("os", &current, base), None);
    }
}
