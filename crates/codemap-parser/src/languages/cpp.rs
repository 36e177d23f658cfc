// ABOUTME: C and C++ language profile
// ABOUTME: Includes, free functions, Class::method members and out-of-class definitions

use codemap_core::FunctionDef;
use std::path::{Path, PathBuf};

use super::{declarations, unclaimed};
use crate::profile::LanguageProfile;
use crate::scan::{
    self, blank_non_code, collect_calls, existing_file, name_pattern, pattern, push_unique,
    BraceIndex, Syntax,
};

pattern!(INCLUDE, r#"(?m)^[ \t]*#[ \t]*include[ \t]*([<"])([^>"\n]+)[>"]"#);
pattern!(
    CLASS,
    r"\b(?:class|struct)\s+(?:\w+\s+)*?([A-Za-z_]\w*)(?:\s+final)?\s*(?::[^{;()]*)?\{"
);
pattern!(
    MEMBER,
    r"(?m)^[ \t]*(?:(?:public|private|protected)\s*:\s*)?(?:(?:virtual|static|inline|explicit|constexpr|friend)\s+)*(?:[\w:<>,*&]+[ \t*&]+)*?(~?[A-Za-z_]\w*)\s*\("
);
pattern!(
    FUNCTION,
    r"(?m)^[ \t]*(?:template\s*<[^>]*>\s*)?(?:(?:static|inline|extern|constexpr|virtual)\s+)*(?:[\w:<>,*&]+[ \t*&]+)+(~?[A-Za-z_]\w*(?:::~?[A-Za-z_]\w*)*)\s*\("
);
pattern!(
    CALL,
    r"([A-Za-z_]\w*(?:(?:::|\.|->)[A-Za-z_]\w*)*)\s*\("
);

const BUILTINS: &[&str] = &[
    "printf", "scanf", "malloc", "free", "calloc", "realloc", "memcpy", "memset", "strlen",
    "strcpy", "strcmp", "strcat", "fopen", "fclose", "fread", "fwrite", "fprintf", "fscanf",
    "std::cout", "std::cin", "std::cerr", "std::endl", "std::string", "std::vector", "std::map",
    "std::make_shared", "std::make_unique", "std::move", "std::forward", "new", "delete",
    "sizeof", "static_cast", "dynamic_cast", "reinterpret_cast", "const_cast",
];

pub struct CppProfile;

impl LanguageProfile for CppProfile {
    fn name(&self) -> &'static str {
        "cpp"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        let mut imports = Vec::new();
        for caps in INCLUDE.captures_iter(text) {
            let (Some(open), Some(path)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let include = if open.as_str() == "<" {
                format!("<{}>", path.as_str().trim())
            } else {
                path.as_str().trim().to_string()
            };
            push_unique(&mut imports, &include);
        }
        imports
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        let syntax = Syntax::C_LIKE;
        let code = blank_non_code(text, syntax);
        let index = BraceIndex::new(&code, syntax);
        let mut found: Vec<(usize, FunctionDef)> = Vec::new();
        let mut claimed = Vec::new();

        for class in class_bodies(&code) {
            let (open, close) = class.body;
            let depth = Some(index.depth_at(open) + 1);
            for member in declarations(&code, &index, &MEMBER, open + 1..close, depth, syntax) {
                let name = member_name(&class.name, &member.name);
                found.push((member.start, FunctionDef::new(name, member.body_text(text))));
            }
            claimed.push(open..close + 1);
        }

        let free = declarations(&code, &index, &FUNCTION, 0..code.len(), None, syntax);
        for decl in unclaimed(free, &mut claimed) {
            let name = qualified_name(&decl.name);
            found.push((decl.start, FunctionDef::new(name, decl.body_text(text))));
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
        current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        if let Some(system) = import.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            return existing_file(base.join("include").join(system));
        }
        let dir = current_file.parent()?;
        existing_file(dir.join(import))
            .or_else(|| existing_file(base.join("include").join(import)))
            .or_else(|| existing_file(base.join(import)))
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        let Some((class, member)) = name.rsplit_once("::") else {
            let re = name_pattern(r"^\s*(?:[\w:<>,*&]+[\s*&]+)+{}\s*\(", name)?;
            return definition_line(text, &re, 0);
        };
        let member = match member {
            "constructor" => class.to_string(),
            "destructor" => format!("~{}", class),
            other => other.to_string(),
        };
        // Out-of-class definitions carry the qualified name.
        let qualified = name_pattern(r"\b{}\s*\(", &format!("{}::{}", class, member))?;
        if let Some(line) = definition_line(text, &qualified, 0) {
            return Some(line);
        }
        let class_re = name_pattern(r"\b(?:class|struct)\s+{}\b", class)?;
        let class_line = scan::find_line(text, &class_re)?;
        let member_re = name_pattern(r"(?:^|[\s*&:]){}\s*\(", &member)?;
        definition_line(text, &member_re, class_line)
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

/// First line after `after` matching `pattern` that is not a statement or prototype.
fn definition_line(text: &str, pattern: &regex::Regex, after: usize) -> Option<usize> {
    text.lines()
        .enumerate()
        .skip(after)
        .find(|(_, line)| pattern.is_match(line) && !line.trim_end().ends_with(';'))
        .map(|(i, _)| i + 1)
}

struct ClassBody {
    name: String,
    /// Offsets of the opening and closing brace.
    body: (usize, usize),
}

fn class_bodies(code: &str) -> Vec<ClassBody> {
    CLASS
        .captures_iter(code)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let open = whole.end() - 1;
            let close = scan::matching_brace(code, open, Syntax::C_LIKE)?;
            Some(ClassBody {
                name: name.as_str().to_string(),
                body: (open, close),
            })
        })
        .collect()
}

fn member_name(class: &str, member: &str) -> String {
    if member == class {
        format!("{}::constructor", class)
    } else if member.strip_prefix('~') == Some(class) {
        format!("{}::destructor", class)
    } else {
        format!("{}::{}", class, member)
    }
}

/// `Widget::Widget` and `Widget::~Widget` become constructor and destructor names.
fn qualified_name(name: &str) -> String {
    match name.rsplit_once("::") {
        Some((owner, member)) => {
            let class = owner.rsplit("::").next().unwrap_or(owner);
            member_name(class, member)
        }
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = r#"#include <vector>
#include "widget.h"
#include "util/math.h"

namespace ui {

class Widget : public Base {
public:
    Widget(int w) : width(w) {
        init(w);
    }
    ~Widget() {
        release();
    }
    virtual int area() const {
        return compute(width, height);
    }
    void draw();
private:
    int width;
};

void Widget::draw() {
    render(this);
}

static int compute(int a, int b) {
    if (a > b) {
        return a * b;
    }
    return helper(a);
}

}
"#;

    #[test]
    fn includes_keep_angle_brackets() {
        assert_eq!(
            CppProfile.extract_imports(SOURCE),
            vec!["<vector>", "widget.h", "util/math.h"]
        );
    }

    #[test]
    fn members_and_free_functions() {
        let functions = CppProfile.extract_functions(SOURCE);
        let names: Vec<_> = functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Widget::constructor",
                "Widget::destructor",
                "Widget::area",
                "Widget::draw",
                "compute",
            ]
        );
        let calls = CppProfile.extract_function_calls(&functions[4].body);
        assert_eq!(calls, vec!["helper"]);
    }

    #[test]
    fn line_numbers() {
        assert_eq!(CppProfile.function_line_number(SOURCE, "compute"), Some(27));
        assert_eq!(CppProfile.function_line_number(SOURCE, "Widget::draw"), Some(23));
        assert_eq!(
            CppProfile.function_line_number(SOURCE, "Widget::destructor"),
            Some(12)
        );
    }

    #[test]
    fn resolves_local_then_include_dir() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("src")).unwrap();
        fs::create_dir_all(base.join("include/util")).unwrap();
        fs::write(base.join("src/widget.h"), "").unwrap();
        fs::write(base.join("include/util/math.h"), "").unwrap();
        let current = base.join("src/widget.cpp");

        assert_eq!(
            CppProfile.resolve_import_path("widget.h", &current, base),
            Some(base.join("src/widget.h"))
        );
        assert_eq!(
            CppProfile.resolve_import_path("util/math.h", &current, base),
            Some(base.join("include/util/math.h"))
        );
        assert_eq!(CppProfile.resolve_import_path("<vector>", &current, base), None);
    }
}
