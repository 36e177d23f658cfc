// ABOUTME: PHP language profile
// ABOUTME: require/include and namespace use imports, class methods, PSR-4 style resolution

use codemap_core::FunctionDef;
use std::path::{Path, PathBuf};

use super::{declarations, unclaimed};
use crate::profile::LanguageProfile;
use crate::scan::{
    self, blank_non_code, collect_calls, dir_for_segments, existing_file, name_pattern, pattern,
    push_unique, BraceIndex, Syntax,
};

pattern!(
    INCLUDE,
    r#"\b(?:require|include)(?:_once)?\s*\(?\s*(__DIR__\s*\.\s*)?['"]([^'"]+)['"]"#
);
pattern!(
    USE,
    r"(?m)^[ \t]*use\s+(?:function\s+|const\s+)?\\?([A-Za-z_][\w\\]*)\s*(?:as\s+\w+\s*)?;"
);
pattern!(
    GROUP_USE,
    r"(?m)^[ \t]*use\s+(?:function\s+|const\s+)?\\?([A-Za-z_][\w\\]*?)\\\{([^}]*)\}"
);
pattern!(CLASS, r"\b(?:class|trait|interface|enum)\s+([A-Za-z_]\w*)");
pattern!(
    METHOD,
    r"(?m)^[ \t]*(?:(?:public|private|protected|static|abstract|final)\s+)*function\s+&?\s*([A-Za-z_]\w*)\s*\("
);
pattern!(FUNCTION, r"\bfunction\s+&?\s*([A-Za-z_]\w*)\s*\(");
pattern!(
    CALL,
    r"([A-Za-z_][\w\\]*(?:(?:->|::)[A-Za-z_]\w*)*)\s*\("
);

const BUILTINS: &[&str] = &[
    "echo", "print", "isset", "unset", "empty", "array", "count", "strlen", "strtolower",
    "strtoupper", "str_replace", "explode", "implode", "json_encode", "json_decode", "array_map",
    "array_filter", "array_merge", "array_keys", "array_values", "in_array", "sprintf", "printf",
    "var_dump", "print_r", "is_array", "is_string", "is_null", "is_numeric", "die", "exit",
    "define", "list", "compact", "extract", "parent::__construct", "trim", "substr", "strpos",
];

/// Roots PSR-4 autoloaders commonly map the top-level namespace onto.
const SOURCE_ROOTS: &[&str] = &["src", "app", "lib"];

pub struct PhpProfile;

impl LanguageProfile for PhpProfile {
    fn name(&self) -> &'static str {
        "php"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        let code = blank_non_code(text, Syntax::PHP);
        let index = BraceIndex::new(&code, Syntax::PHP);
        let mut found: Vec<(usize, String)> = Vec::new();

        for caps in INCLUDE.captures_iter(text) {
            let Some(path) = caps.get(2) else { continue };
            let import = if caps.get(1).is_some() {
                format!("./{}", path.as_str().trim_start_matches('/'))
            } else {
                path.as_str().to_string()
            };
            found.push((path.start(), import));
        }

        // `use` inside a class body imports a trait, not a namespace.
        for caps in USE.captures_iter(&code) {
            let Some(name) = caps.get(1).filter(|m| index.depth_at(m.start()) == 0) else {
                continue;
            };
            found.push((name.start(), name.as_str().to_string()));
        }
        for caps in GROUP_USE.captures_iter(&code) {
            let (Some(prefix), Some(items)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            for item in items.as_str().split(',') {
                if let Some(leaf) = item.split_whitespace().next() {
                    found.push((prefix.start(), format!("{}\\{}", prefix.as_str(), leaf)));
                }
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        let mut imports = Vec::new();
        for (_, import) in found {
            push_unique(&mut imports, &import);
        }
        imports
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        let syntax = Syntax::PHP;
        let code = blank_non_code(text, syntax);
        let index = BraceIndex::new(&code, syntax);
        let mut found: Vec<(usize, FunctionDef)> = Vec::new();
        let mut claimed = Vec::new();

        for class in declarations(&code, &index, &CLASS, 0..code.len(), None, syntax) {
            let depth = Some(class.member_depth(&index));
            let inner = class.body.inner.clone();
            for method in declarations(&code, &index, &METHOD, inner, depth, syntax) {
                let name = format!("{}.{}", class.name, method.name);
                found.push((method.start, FunctionDef::new(name, method.body_text(text))));
            }
            claimed.push(class.body.span.clone());
        }

        let free = declarations(&code, &index, &FUNCTION, 0..code.len(), None, syntax);
        for decl in unclaimed(free, &mut claimed) {
            found.push((decl.start, FunctionDef::new(decl.name.clone(), decl.body_text(text))));
        }

        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, f)| f).collect()
    }

    fn extract_function_calls(&self, body: &str) -> Vec<String> {
        collect_calls(body, &CALL, Syntax::PHP, BUILTINS)
    }

    fn resolve_import_path(
        &self,
        import: &str,
        current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        let dir = current_file.parent()?;
        if import.contains('/') || import.ends_with(".php") {
            if import.starts_with("./") || import.starts_with("../") {
                return existing_file(dir.join(import));
            }
            return existing_file(dir.join(import)).or_else(|| existing_file(base.join(import)));
        }

        let segments: Vec<&str> = import
            .trim_start_matches('\\')
            .split('\\')
            .filter(|s| !s.is_empty())
            .collect();
        let (_, tail) = segments.split_first()?;
        let full = format!("{}.php", segments.join("/"));
        let vendorless = format!("{}.php", tail.join("/"));

        existing_file(base.join(&full))
            .or_else(|| {
                SOURCE_ROOTS
                    .iter()
                    .find_map(|root| existing_file(base.join(root).join(&full)))
            })
            .or_else(|| {
                // The first namespace segment is usually the autoload prefix.
                (!tail.is_empty())
                    .then(|| {
                        SOURCE_ROOTS
                            .iter()
                            .find_map(|root| existing_file(base.join(root).join(&vendorless)))
                    })
                    .flatten()
            })
            .or_else(|| dir_for_segments(base, &segments))
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        let function_re = |n: &str| name_pattern(r"\bfunction\s+&?\s*{}\s*\(", n);
        match name.rsplit_once('.') {
            Some((class, method)) => {
                let class_re =
                    name_pattern(r"\b(?:class|trait|interface|enum)\s+{}\b", class)?;
                let class_line = scan::find_line(text, &class_re)?;
                scan::find_line_after(text, &function_re(method)?, class_line)
            }
            None => scan::find_line(text, &function_re(name)?),
        }
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }
}
