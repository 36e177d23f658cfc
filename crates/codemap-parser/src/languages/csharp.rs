// ABOUTME: C# language profile
// ABOUTME: using directives, namespace-qualified members, property accessors as Prop.get / Prop.set

use codemap_core::FunctionDef;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::declarations;
use crate::profile::LanguageProfile;
use crate::scan::{
    self, blank_non_code, collect_calls, dir_for_segments, existing_file, name_pattern, pattern,
    push_unique, BraceIndex, Syntax,
};

pattern!(
    USING,
    r"(?m)^[ \t]*(?:global\s+)?using\s+(static\s+)?(?:[A-Za-z_]\w*\s*=\s*)?([A-Za-z_][\w.]*)\s*;"
);
pattern!(NAMESPACE, r"\bnamespace\s+([A-Za-z_][\w.]*)\s*([{;])");
pattern!(TYPE_DECL, r"\b(?:class|struct|interface|record)\s+([A-Za-z_]\w*)");
pattern!(
    METHOD,
    r"(?m)^[ \t]*(?:\[[^\]\n]*\]\s*)*(?:(?:public|private|protected|internal|static|virtual|override|abstract|sealed|async|partial|extern|new|unsafe|readonly)\s+)*(?:[\w<>\[\],.?]+\s+)?([A-Za-z_]\w*)\s*(?:<[^>]*>)?\s*\("
);
pattern!(
    PROPERTY,
    r"(?m)^[ \t]*(?:(?:public|private|protected|internal|static|virtual|override|abstract|sealed|new|required)\s+)*([\w<>\[\],.?]+)\s+([A-Za-z_]\w*)\s*\{"
);
pattern!(ACCESSOR, r"\b(get|set)\s*(\{|=>)");
pattern!(CALL, r"([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*)\s*\(");

const MODIFIERS: &str = r"(?:(?:public|private|protected|internal|static|virtual|override|abstract|sealed|async|partial|extern|new|unsafe|readonly)\s+)*";

const TYPE_KEYWORDS: &[&str] = &["class", "struct", "interface", "record", "enum", "namespace"];

const BUILTINS: &[&str] = &[
    "Console.WriteLine", "Console.Write", "Console.ReadLine", "Console.Read", "string.Format",
    "int.Parse", "double.Parse", "bool.Parse", "Convert.ToInt32", "Convert.ToString",
    "Convert.ToDouble", "Convert.ToBoolean", "Math.Abs", "Math.Min", "Math.Max", "Math.Sqrt",
    "Math.Round", "string.IsNullOrEmpty", "string.IsNullOrWhiteSpace", "Enumerable.Where",
    "Enumerable.Select", "Enumerable.OrderBy", "Enumerable.GroupBy", "Enumerable.ToList",
    "Enumerable.ToArray", "List.Add", "List.Remove", "List.Clear", "Dictionary.Add",
    "Dictionary.Remove", "Dictionary.ContainsKey", "Task.Run", "Task.Delay", "Task.WhenAll",
    "Task.WhenAny", "Task.FromResult", "Equals", "ToString", "GetHashCode", "GetType", "nameof",
    "typeof", "base", "this",
];

const SOURCE_DIRS: &[&str] = &["src", "source", "Sources", "App_Code"];

pub struct CSharpProfile;

impl LanguageProfile for CSharpProfile {
    fn name(&self) -> &'static str {
        "csharp"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        let code = blank_non_code(text, Syntax::C_LIKE);
        let mut imports = Vec::new();
        for caps in USING.captures_iter(&code) {
            let Some(target) = caps.get(2) else { continue };
            let import = if caps.get(1).is_some() {
                format!("static:{}", target.as_str())
            } else {
                target.as_str().to_string()
            };
            push_unique(&mut imports, &import);
        }
        imports
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        let syntax = Syntax::C_LIKE;
        let code = blank_non_code(text, syntax);
        let index = BraceIndex::new(&code, syntax);
        let namespaces = namespace_spans(&code);

        let mut found: Vec<(usize, FunctionDef)> = Vec::new();
        for class in declarations(&code, &index, &TYPE_DECL, 0..code.len(), None, syntax) {
            let owner = qualify(&namespaces, class.start, &class.name);
            let depth = class.member_depth(&index);
            let inner = class.body.inner.clone();

            for member in declarations(&code, &index, &METHOD, inner.clone(), Some(depth), syntax) {
                let member_name = if member.name == class.name {
                    "constructor"
                } else {
                    member.name.as_str()
                };
                let name = format!("{}.{}", owner, member_name);
                found.push((member.start, FunctionDef::new(name, member.body_text(text))));
            }

            for (start, name, body) in accessors(&code, &index, inner, depth) {
                let name = format!("{}.{}", owner, name);
                let body = text.get(body).unwrap_or("").to_string();
                found.push((start, FunctionDef::new(name, body)));
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
        current_file: &Path,
        base: &Path,
    ) -> Option<PathBuf> {
        let import = import.trim_start_matches("static:");
        let root = import.split('.').next().unwrap_or(import);
        if root == "System" || root == "Microsoft" {
            return None;
        }

        let relative = format!("{}.cs", import.replace('.', "/"));
        let dir = current_file.parent()?;
        existing_file(dir.join(&relative))
            .or_else(|| existing_file(base.join(&relative)))
            .or_else(|| {
                SOURCE_DIRS
                    .iter()
                    .find_map(|src| existing_file(base.join(src).join(&relative)))
            })
            .or_else(|| {
                // A namespace maps onto a directory of sources.
                let segments: Vec<&str> = import.split('.').collect();
                dir_for_segments(base, &segments)
            })
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        let parts: Vec<&str> = name.split('.').collect();
        let accessor = parts.last().copied().filter(|p| *p == "get" || *p == "set");
        let member_idx = parts.len().checked_sub(if accessor.is_some() { 2 } else { 1 })?;
        let class_idx = member_idx.checked_sub(1)?;
        let (class, member) = (parts[class_idx], parts[member_idx]);

        let mut after = 0;
        if class_idx > 0 {
            let namespace = parts[..class_idx].join(".");
            let ns_re = name_pattern(r"\bnamespace\s+{}\b", &namespace)?;
            after = scan::find_line(text, &ns_re)?;
        }
        let class_re = name_pattern(r"\b(?:class|struct|interface|record)\s+{}\b", class)?;
        let class_line = scan::find_line_after(text, &class_re, after.saturating_sub(1))?;

        if let Some(accessor) = accessor {
            let prop_re = name_pattern(&format!(r"^\s*{}[\w<>\[\],.?]+\s+{{}}\s*(?:\{{|$)", MODIFIERS), member)?;
            let prop_line = scan::find_line_after(text, &prop_re, class_line)?;
            let acc_re = name_pattern(r"\b{}\s*(?:=>|\{|;)", accessor)?;
            return scan::find_line_after(text, &acc_re, prop_line - 1);
        }

        let member_re = if member == "constructor" {
            name_pattern(&format!(r"^\s*(?:\[[^\]]*\]\s*)*{}{{}}\s*\(", MODIFIERS), class)?
        } else {
            name_pattern(
                &format!(
                    r"^\s*(?:\[[^\]]*\]\s*)*{}[\w<>\[\],.?]+\s+{{}}\s*(?:<[^>]*>)?\s*\(",
                    MODIFIERS
                ),
                member,
            )?
        };
        text.lines()
            .enumerate()
            .skip(class_line)
            .find(|(_, line)| {
                let trimmed = line.trim_end();
                member_re.is_match(line) && (!trimmed.ends_with(';') || trimmed.contains("=>"))
            })
            .map(|(i, _)| i + 1)
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

/// Namespace name and the span it covers; file-scoped namespaces run to the end of the file.
fn namespace_spans(code: &str) -> Vec<(String, Range<usize>)> {
    let mut spans = Vec::new();
    for caps in NAMESPACE.captures_iter(code) {
        let (Some(name), Some(opener)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let end = if opener.as_str() == "{" {
            match scan::matching_brace(code, opener.start(), Syntax::C_LIKE) {
                Some(close) => close + 1,
                None => continue,
            }
        } else {
            code.len()
        };
        spans.push((name.as_str().to_string(), opener.start()..end));
    }
    spans
}

fn qualify(namespaces: &[(String, Range<usize>)], offset: usize, name: &str) -> String {
    let mut parts: Vec<&str> = namespaces
        .iter()
        .filter(|(_, span)| span.contains(&offset))
        .map(|(ns, _)| ns.as_str())
        .collect();
    parts.push(name);
    parts.join(".")
}

/// Accessors with a body, as (start, `Prop.get`, body range), for properties declared at `depth`.
fn accessors(
    code: &str,
    index: &BraceIndex,
    range: Range<usize>,
    depth: u32,
) -> Vec<(usize, String, Range<usize>)> {
    let Some(slice) = code.get(range.clone()) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for caps in PROPERTY.captures_iter(slice) {
        let (Some(whole), Some(ty), Some(prop)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if TYPE_KEYWORDS.contains(&ty.as_str()) {
            continue;
        }
        if index.depth_at(range.start + prop.start()) != depth {
            continue;
        }
        let open = range.start + whole.end() - 1;
        let Some(close) = scan::matching_brace(code, open, Syntax::C_LIKE) else {
            continue;
        };
        let block = open + 1..close;
        let Some(block_text) = code.get(block.clone()) else {
            continue;
        };
        for acc in ACCESSOR.captures_iter(block_text) {
            let (Some(kind), Some(opener)) = (acc.get(1), acc.get(2)) else {
                continue;
            };
            if index.depth_at(block.start + kind.start()) != depth + 1 {
                continue;
            }
            let body_start = block.start + opener.start();
            let body = if opener.as_str() == "{" {
                match scan::matching_brace(code, body_start, Syntax::C_LIKE) {
                    Some(end) => body_start + 1..end,
                    None => continue,
                }
            } else {
                let expr = body_start + 2;
                expr..scan::expression_end(code, expr, Syntax::C_LIKE)
            };
            out.push((
                block.start + kind.start(),
                format!("{}.{}", prop.as_str(), kind.as_str()),
                body,
            ));
        }
    }
    out
}
