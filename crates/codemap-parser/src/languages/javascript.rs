// ABOUTME: JavaScript language profile and the extraction shared with TypeScript
// ABOUTME: ES module, CommonJS and dynamic imports; functions, arrows and class members

use codemap_core::FunctionDef;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{declarations, Declaration};
use crate::profile::LanguageProfile;
use crate::scan::{
    self, blank_non_code, collect_calls, existing_file, name_pattern, pattern, push_unique,
    BraceIndex, Syntax,
};

pattern!(IMPORT_FROM, r#"\bimport\s+[^;'"]*?\bfrom\s*['"]([^'"]+)['"]"#);
pattern!(IMPORT_BARE, r#"\bimport\s*['"]([^'"]+)['"]"#);
pattern!(EXPORT_FROM, r#"\bexport\s+[^;'"]*?\bfrom\s*['"]([^'"]+)['"]"#);
pattern!(REQUIRE, r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#);
pattern!(DYNAMIC_IMPORT, r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#);

pattern!(
    FUNCTION_DECL,
    r"\b(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\("
);
pattern!(
    VAR_FUNCTION,
    r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=;\n]+?)?=\s*(?:async\s+)?(?:function\b|(?:<[^>]*>\s*)?\([^)]*\)\s*(?::[^=;\n]+?)?=>|[A-Za-z_$][\w$]*\s*=>)"
);
pattern!(CLASS, r"\bclass\s+([A-Za-z_$][\w$]*)");
pattern!(
    METHOD,
    r"(?m)^[ \t]*(?:(?:static|async|get|set|public|private|protected|readonly|override|abstract)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\("
);
pattern!(
    FIELD_ARROW,
    r"(?m)^[ \t]*(?:(?:static|public|private|protected|readonly)\s+)*([A-Za-z_$][\w$]*)\s*(?::[^=;\n]+?)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=;\n]+?)?=>"
);
pattern!(
    CALL,
    r"([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*(?:<[\w$.,\s\[\]]*>)?\s*\("
);

pub(crate) const BUILTINS: &[&str] = &[
    "console.log", "console.error", "console.warn", "console.info", "console.debug",
    "parseInt", "parseFloat", "setTimeout", "setInterval", "clearTimeout", "clearInterval",
    "encodeURI", "decodeURI", "encodeURIComponent", "decodeURIComponent", "isNaN", "isFinite",
    "eval", "alert", "confirm", "prompt", "require", "Math.abs", "Math.ceil", "Math.floor",
    "Math.max", "Math.min", "Math.random", "Math.round", "JSON.parse", "JSON.stringify",
    "Object.keys", "Object.values", "Object.entries", "Object.assign", "Array.isArray",
    "Array.from", "Date.now", "Promise.all", "Promise.resolve", "Promise.reject", "String",
    "Number", "Boolean", "Symbol",
];

const JS_EXTENSIONS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx"];
const JS_INDEX_FILES: &[&str] = &["index.js", "index.jsx", "index.ts", "index.tsx"];

pub struct JavaScriptProfile;

impl LanguageProfile for JavaScriptProfile {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        module_imports(text)
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        script_functions(text)
    }

    fn extract_function_calls(&self, body: &str) -> Vec<String> {
        script_calls(body, BUILTINS)
    }

    fn resolve_import_path(
        &self,
        import: &str,
        current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        resolve_module(import, current_file, base, JS_EXTENSIONS, JS_INDEX_FILES)
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        script_line_number(text, name)
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

pub(crate) fn module_imports(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = Vec::new();
    for re in [
        &*IMPORT_FROM,
        &*IMPORT_BARE,
        &*EXPORT_FROM,
        &*REQUIRE,
        &*DYNAMIC_IMPORT,
    ] {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str()));
            }
        }
    }
    found.sort_by_key(|(offset, _)| *offset);

    let mut imports = Vec::new();
    for (_, spec) in found {
        push_unique(&mut imports, spec);
    }
    imports
}

/// Named functions and function-valued bindings at any depth, plus class members as
/// `Class.member`, in source order.
pub(crate) fn script_functions(text: &str) -> Vec<FunctionDef> {
    let syntax = Syntax::JAVASCRIPT;
    let code = blank_non_code(text, syntax);
    let index = BraceIndex::new(&code, syntax);
    let all = 0..code.len();

    let mut found: Vec<(usize, String, Declaration)> = Vec::new();
    for decl in declarations(&code, &index, &FUNCTION_DECL, all.clone(), None, syntax)
        .into_iter()
        .chain(declarations(&code, &index, &VAR_FUNCTION, all.clone(), None, syntax))
    {
        found.push((decl.start, decl.name.clone(), decl));
    }

    for class in declarations(&code, &index, &CLASS, all, None, syntax) {
        let depth = Some(class.member_depth(&index));
        let inner = class.body.inner.clone();
        let members = declarations(&code, &index, &METHOD, inner.clone(), depth, syntax)
            .into_iter()
            .chain(declarations(&code, &index, &FIELD_ARROW, inner, depth, syntax));
        for member in members {
            let name = format!("{}.{}", class.name, member.name);
            found.push((member.start, name, member));
        }
    }

    found.sort_by_key(|(start, _, _)| *start);
    found
        .into_iter()
        .map(|(_, name, decl)| FunctionDef::new(name, decl.body_text(text)))
        .collect()
}

pub(crate) fn script_calls(body: &str, builtins: &[&str]) -> Vec<String> {
    collect_calls(body, &CALL, Syntax::JAVASCRIPT, builtins)
}

pub(crate) fn script_line_number(text: &str, name: &str) -> Option<usize> {
    if let Some((class, member)) = name.split_once('.') {
        let class_re = name_pattern(r"\bclass\s+{}\b", class)?;
        let class_line = scan::find_line(text, &class_re)?;
        let member_re = name_pattern(
            r"^\s*(?:(?:static|async|get|set|public|private|protected|readonly|override|abstract)\s+)*\*?\s*{}\s*(?:<[^>]*>)?\s*(?:\(|[:=])",
            member,
        )?;
        return scan::find_line_after(text, &member_re, class_line.saturating_sub(1))
            .filter(|line| *line >= class_line);
    }

    let declared = name_pattern(r"\bfunction\s*\*?\s*{}\s*[<(]", name)?;
    let bound = name_pattern(r"\b(?:const|let|var)\s+{}\b\s*(?::[^=]+)?=", name)?;
    scan::find_line(text, &declared).or_else(|| scan::find_line(text, &bound))
}

/// Local file behind a relative or root-absolute module specifier. Bare specifiers are packages.
pub(crate) fn resolve_module(
    spec: &str,
    current_file: &Path,
    base: &Path,
    extensions: &[&str],
    index_files: &[&str],
) -> Option<PathBuf> {
    let target = if spec.starts_with("./") || spec.starts_with("../") {
        current_file.parent()?.join(spec)
    } else if let Some(rooted) = spec.strip_prefix('/') {
        base.join(rooted)
    } else {
        return None;
    };

    if let Some(file) = existing_file(target.clone()) {
        return Some(file);
    }
    for ext in extensions {
        let mut candidate: OsString = target.clone().into_os_string();
        candidate.push(ext);
        if let Some(file) = existing_file(PathBuf::from(candidate)) {
            return Some(file);
        }
    }
    index_files
        .iter()
        .find_map(|index| existing_file(target.join(index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = r#"import React, { useState } from 'react';
import './styles.css';
const api = require("./api");
export { helper } from "./helpers";

// function commented() {}
function render(props) {
  const label = format(props.name);
  return draw(label, "render(x)");
}

const format = (name) => {
  return name.trim();
};

const double = x => x * 2;

class Widget extends Base {
  constructor(opts) {
    super(opts);
    this.state = init(opts);
  }

  static create() {
    return new Widget({});
  }

  async load() {
    const mod = await import('./lazy');
    return mod.run();
  }

  onClick = (event) => {
    this.load();
  };
}
"#;

    #[test]
    fn imports_in_source_order() {
        let imports = JavaScriptProfile.extract_imports(SOURCE);
        assert_eq!(
            imports,
            vec!["react", "./styles.css", "./api", "./helpers", "./lazy"]
        );
    }

    #[test]
    fn functions_arrows_and_members() {
        let functions = JavaScriptProfile.extract_functions(SOURCE);
        let names: Vec<_> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "render",
                "format",
                "double",
                "Widget.constructor",
                "Widget.create",
                "Widget.load",
                "Widget.onClick",
            ]
        );
        assert_eq!(functions[2].body, "x * 2");
    }

    #[test]
    fn calls_ignore_strings_and_builtins() {
        let functions = JavaScriptProfile.extract_functions(SOURCE);
        let calls = JavaScriptProfile.extract_function_calls(&functions[0].body);
        assert_eq!(calls, vec!["format", "draw"]);
        let calls = JavaScriptProfile.extract_function_calls(&functions[3].body);
        assert_eq!(calls, vec!["init"]);
    }

    #[test]
    fn line_numbers() {
        assert_eq!(JavaScriptProfile.function_line_number(SOURCE, "render"), Some(7));
        assert_eq!(JavaScriptProfile.function_line_number(SOURCE, "format"), Some(12));
        assert_eq!(
            JavaScriptProfile.function_line_number(SOURCE, "Widget.load"),
            Some(28)
        );
        assert_eq!(JavaScriptProfile.function_line_number(SOURCE, "Widget.gone"), None);
    }

    #[test]
    fn resolves_relative_modules() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("src/helpers")).unwrap();
        fs::write(base.join("src/api.js"), "").unwrap();
        fs::write(base.join("src/helpers/index.ts"), "").unwrap();
        let current = base.join("src/app.js");

        assert_eq!(
            JavaScriptProfile.resolve_import_path("./api", &current, base),
            Some(base.join("src/./api.js"))
        );
        assert_eq!(
            JavaScriptProfile.resolve_import_path("./helpers", &current, base),
            Some(base.join("src/./helpers/index.ts"))
        );
        assert_eq!(JavaScriptProfile.resolve_import_path("react", &current, base), None);
    }
}
