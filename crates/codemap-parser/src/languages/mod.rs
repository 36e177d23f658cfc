// ABOUTME: Language profile implementations and shared declaration scanning
// ABOUTME: Brace languages locate declarations by pattern, then bodies by brace matching

pub mod cpp;
pub mod csharp;
pub mod generic;
pub mod go;
pub mod java;
pub mod javascript;
pub mod php;
pub mod python;
pub mod ruby;
pub mod typescript;

pub use cpp::CppProfile;
pub use csharp::CSharpProfile;
pub use generic::GenericProfile;
pub use go::GoProfile;
pub use java::JavaProfile;
pub use javascript::JavaScriptProfile;
pub use php::PhpProfile;
pub use python::PythonProfile;
pub use ruby::RubyProfile;
pub use typescript::TypeScriptProfile;

use regex::Regex;
use std::ops::Range;

use crate::scan::{body_after, is_control_keyword, BraceIndex, Body, Syntax};

/// A named declaration and the body that follows it.
#[derive(Debug, Clone)]
pub(crate) struct Declaration {
    pub name: String,
    pub start: usize,
    pub body: Body,
}

impl Declaration {
    /// Brace depth of the declarations directly inside this one's body.
    pub fn member_depth(&self, index: &BraceIndex) -> u32 {
        index.depth_at(self.body.span.start) + 1
    }

    pub fn body_text(&self, text: &str) -> String {
        text.get(self.body.inner.clone()).unwrap_or("").to_string()
    }
}

/// Declarations matched by `pattern` inside `range` of `code` that have a body.
///
/// Group 1 of `pattern` is the name. With `depth` set, only matches whose name sits at that
/// brace depth are kept.
pub(crate) fn declarations(
    code: &str,
    index: &BraceIndex,
    pattern: &Regex,
    range: Range<usize>,
    depth: Option<u32>,
    syntax: Syntax,
) -> Vec<Declaration> {
    let Some(slice) = code.get(range.clone()) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for caps in pattern.captures_iter(slice) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name_start = range.start + name.start();
        if depth.is_some_and(|d| index.depth_at(name_start) != d) {
            continue;
        }
        if is_control_keyword(name.as_str()) {
            continue;
        }
        if let Some(body) = body_after(code, range.start + name.end(), syntax) {
            out.push(Declaration {
                name: name.as_str().to_string(),
                start: range.start + whole.start(),
                body,
            });
        }
    }
    out
}

/// Keeps declarations that do not start inside an already claimed span, claiming each kept body.
pub(crate) fn unclaimed(
    mut decls: Vec<Declaration>,
    claimed: &mut Vec<Range<usize>>,
) -> Vec<Declaration> {
    decls.sort_by_key(|d| d.start);
    let mut kept = Vec::new();
    for decl in decls {
        if claimed.iter().any(|span| span.contains(&decl.start)) {
            continue;
        }
        claimed.push(decl.body.span.clone());
        kept.push(decl);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::blank_non_code;

    #[test]
    fn declarations_respect_depth() {
        let text = "fn a() { fn b() {} }\nfn c() {}";
        let re = Regex::new(r"fn\s+(\w+)\s*\(").unwrap();
        let code = blank_non_code(text, Syntax::C_LIKE);
        let index = BraceIndex::new(&code, Syntax::C_LIKE);

        let top = declarations(&code, &index, &re, 0..code.len(), Some(0), Syntax::C_LIKE);
        let names: Vec<_> = top.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);

        let all = declarations(&code, &index, &re, 0..code.len(), None, Syntax::C_LIKE);
        let mut claimed = Vec::new();
        let kept = unclaimed(all, &mut claimed);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].body_text(text), " fn b() {} ");
    }
}
