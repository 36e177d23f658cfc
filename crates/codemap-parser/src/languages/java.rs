// ABOUTME: Java language profile
// ABOUTME: Package imports, class members as Class.method, source-root import resolution

use codemap_core::FunctionDef;
use std::path::{Path, PathBuf};

use super::declarations;
use crate::profile::LanguageProfile;
use crate::scan::{
    self, blank_non_code, collect_calls, existing_dir, existing_file, name_pattern, pattern,
    push_unique, BraceIndex, Syntax,
};

pattern!(IMPORT, r"(?m)^\s*import\s+(static\s+)?([\w.]+(?:\.\*)?)\s*;");
pattern!(
    TYPE_DECL,
    r"\b(?:class|interface|enum|record)\s+([A-Za-z_]\w*)"
);
pattern!(
    METHOD,
    r"(?m)^[ \t]*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^>]+>\s+)?(?:[\w.$]+(?:<[^;{}()]*>)?(?:\[\])*\s+)?([A-Za-z_$][\w$]*)\s*\("
);
pattern!(CALL, r"([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*\(");

const BUILTINS: &[&str] = &[
    "System.out.println", "System.out.print", "System.err.println", "System.err.print",
    "System.out.printf", "String.format", "String.valueOf", "Integer.parseInt",
    "Double.parseDouble", "Boolean.parseBoolean", "Math.abs", "Math.min", "Math.max",
    "Math.sqrt", "Math.random", "Arrays.toString", "Arrays.asList", "Collections.sort",
    "List.of", "Map.of", "Objects.equals", "Objects.hash", "Objects.requireNonNull", "equals",
    "toString", "hashCode", "clone", "compareTo", "super", "this",
];

const SOURCE_ROOTS: &[&str] = &["src", "src/main/java", "src/test/java", ""];

pub struct JavaProfile;

impl LanguageProfile for JavaProfile {
    fn name(&self) -> &'static str {
        "java"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        let code = blank_non_code(text, Syntax::C_LIKE);
        let mut imports = Vec::new();
        for caps in IMPORT.captures_iter(&code) {
            let Some(path) = caps.get(2) else { continue };
            let import = if caps.get(1).is_some() {
                format!("static:{}", path.as_str())
            } else {
                path.as_str().to_string()
            };
            push_unique(&mut imports, &import);
        }
        imports
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        let syntax = Syntax::C_LIKE;
        let code = blank_non_code(text, syntax);
        let index = BraceIndex::new(&code, syntax);

        let mut found = Vec::new();
        for class in declarations(&code, &index, &TYPE_DECL, 0..code.len(), None, syntax) {
            let depth = Some(class.member_depth(&index));
            for member in declarations(&code, &index, &METHOD, class.body.inner.clone(), depth, syntax)
            {
                let member_name = if member.name == class.name {
                    "constructor"
                } else {
                    member.name.as_str()
                };
                let name = format!("{}.{}", class.name, member_name);
                found.push((member.start, FunctionDef::new(name, member.body_text(text))));
            }
        }
        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, f)| f).collect()
    }

    fn extract_function_calls(&self, body: &str) -> Vec<String> {
        collect_calls(body, &CALL, Syntax::C_LIKE, BUILTINS)
    }

    fn resolve_import_path(
        &self,
        import: &str,
        _current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        let is_static = import.starts_with("static:");
        let import = import.trim_start_matches("static:");
        if import.starts_with("java.") || import.starts_with("javax.") {
            return None;
        }

        if let Some(package) = import.strip_suffix(".*") {
            let relative = package.replace('.', "/");
            return SOURCE_ROOTS
                .iter()
                .find_map(|root| existing_dir(base.join(root).join(&relative)))
                .or_else(|| {
                    // `import static pkg.Type.*` names a type, not a package
                    is_static.then(|| probe_type(base, package)).flatten()
                });
        }

        probe_type(base, import).or_else(|| {
            // `import static pkg.Type.member`
            let (owner, _) = import.rsplit_once('.')?;
            is_static.then(|| probe_type(base, owner)).flatten()
        })
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        let Some((class, member)) = name.rsplit_once('.') else {
            return scan::find_line(text, &method_line_pattern(name)?);
        };
        let class = class.rsplit('.').next().unwrap_or(class);
        let class_re = name_pattern(r"\b(?:class|interface|enum|record)\s+{}\b", class)?;
        let class_line = scan::find_line(text, &class_re)?;
        let member_re = if member == "constructor" {
            name_pattern(r"^\s*(?:(?:public|protected|private)\s+)?{}\s*\(", class)?
        } else {
            method_line_pattern(member)?
        };
        scan::find_line_after(text, &member_re, class_line)
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

fn method_line_pattern(name: &str) -> Option<regex::Regex> {
    name_pattern(r"^\s*(?:@\w+\s+)*(?:[\w.$<>\[\],?]+\s+)+{}\s*\(", name)
}

fn probe_type(base: &Path, dotted: &str) -> Option<PathBuf> {
    let relative = format!("{}.java", dotted.replace('.', "/"));
    SOURCE_ROOTS
        .iter()
        .find_map(|root| existing_file(base.join(root).join(&relative)))
}
