// ABOUTME: Fallback profile for files no dedicated profile claims
// ABOUTME: Common import and declaration shapes shared by many curly-brace and scripting languages

use codemap_core::FunctionDef;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use super::{declarations, unclaimed};
use crate::profile::LanguageProfile;
use crate::scan::{
    self, blank_non_code, collect_calls, existing_file, name_pattern, pattern, push_unique,
    BraceIndex, Syntax,
};

static IMPORTS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"import\s+["']([^"']+)["']"#,
        r"import\s+([A-Za-z0-9_.]+)",
        r#"#include\s+["<]([^">]+)[">]"#,
        r#"require\s+["']([^"']+)["']"#,
        r"using\s+([A-Za-z0-9_.]+)",
    ]
    .iter()
    .map(|re| Regex::new(re).expect("built-in pattern"))
    .collect()
});

pattern!(
    KEYWORD_DECL,
    r"\b(?:function|func|def|sub|void|public|private|protected|internal|static)\s+([A-Za-z_]\w*)\s*\("
);
pattern!(
    MODIFIED_DECL,
    r"\b(?:public|private|protected|internal|static|final|async|override|virtual|abstract)\s+(?:[\w<>\[\]]+\s+)?([A-Za-z_]\w*)\s*\("
);
pattern!(CALL, r"([A-Za-z_]\w*)\s*\(");

const DECLARATION_TEMPLATES: &[&str] = &[
    r"\b(?:function|func|def|sub|void|public|private|protected|internal|static)\s+{}\s*\(",
    r"\b(?:public|private|protected|internal|static|final|async|override|virtual|abstract)\s+(?:[\w<>\[\]]+\s+)?{}\s*\(",
];

pub struct GenericProfile;

impl LanguageProfile for GenericProfile {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        let mut imports = Vec::new();
        for re in IMPORTS.iter() {
            for caps in re.captures_iter(text) {
                if let Some(m) = caps.get(1).filter(|m| !m.as_str().is_empty()) {
                    push_unique(&mut imports, m.as_str());
                }
            }
        }
        imports
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        let syntax = Syntax::C_LIKE;
        let code = blank_non_code(text, syntax);
        let index = BraceIndex::new(&code, syntax);
        let all = 0..code.len();

        let mut decls = declarations(&code, &index, &KEYWORD_DECL, all.clone(), None, syntax);
        decls.extend(declarations(&code, &index, &MODIFIED_DECL, all, None, syntax));
        unclaimed(decls, &mut Vec::new())
            .into_iter()
            .map(|decl| FunctionDef::new(decl.name.clone(), decl.body_text(text)))
            .collect()
    }

    fn extract_function_calls(&self, body: &str) -> Vec<String> {
        collect_calls(body, &CALL, Syntax::C_LIKE, &[])
    }

    fn resolve_import_path(
        &self,
        import: &str,
        current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        if import.starts_with("./") || import.starts_with("../") {
            return existing_file(current_file.parent()?.join(import));
        }
        existing_file(base.join(import))
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        DECLARATION_TEMPLATES
            .iter()
            .filter_map(|template| name_pattern(template, name))
            .filter_map(|re| scan::find_line(text, &re))
            .min()
    }

    fn builtins(&self) -> &'static [&'static str] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = r#"import "lib/util.dart";
#include <stdio.h>

void main() {
  run(greet("x"));
}

static int greet(String name) {
  return length(name);
}
"#;

    #[test]
    fn common_shapes() {
        assert_eq!(
            GenericProfile.extract_imports(SOURCE),
            vec!["lib/util.dart", "stdio.h"]
        );
        let functions = GenericProfile.extract_functions(SOURCE);
        let names: Vec<_> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["main", "greet"]);
        assert_eq!(
            GenericProfile.extract_function_calls(&functions[0].body),
            vec!["run", "greet"]
        );
    }

    #[test]
    fn line_numbers() {
        assert_eq!(GenericProfile.function_line_number(SOURCE, "main"), Some(4));
        assert_eq!(GenericProfile.function_line_number(SOURCE, "greet"), Some(8));
        assert_eq!(GenericProfile.function_line_number(SOURCE, "length"), None);
    }

    #[test]
    fn resolves_existing_files_only() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("lib")).unwrap();
        fs::write(base.join("lib/util.dart"), "").unwrap();
        let current = base.join("main.dart");

        assert_eq!(
            GenericProfile.resolve_import_path("lib/util.dart", &current, base),
            Some(base.join("lib/util.dart"))
        );
        assert_eq!(GenericProfile.resolve_import_path("stdio.h", &current, base), None);
    }
}
