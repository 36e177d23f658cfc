// ABOUTME: Ruby language profile
// ABOUTME: require / require_relative imports and def ... end bodies tracked by keyword nesting

use codemap_core::FunctionDef;
use std::path::{Path, PathBuf};

use crate::profile::LanguageProfile;
use crate::scan::{
    self, blank_non_code, collect_calls, existing_file, lines_with_offsets, name_pattern, pattern,
    push_unique, Syntax,
};

pattern!(
    REQUIRE,
    r#"(?m)^[ \t]*(require_relative|require|load)\s*\(?\s*['"]([^'"]+)['"]"#
);
pattern!(DEF, r"^def\s+(?:self\.)?([A-Za-z_]\w*[?!=]?)(?:\s*\([^)]*\))?");
pattern!(
    ENDLESS_DEF,
    r"^def\s+(?:self\.)?[A-Za-z_]\w*[?!]?(?:\s+|\s*\([^)]*\)\s*)=(?:[^=~]|$)"
);
pattern!(OWNER, r"^(?:class|module)\s+(?:[A-Z]\w*::)*([A-Z]\w*)");
pattern!(
    BLOCK_START,
    r"^(class|module|if|unless|while|until|case|begin|for)\b"
);
pattern!(ASSIGNED_BLOCK, r"(?:^|[^=!<>])=\s*(if|unless|case|begin|while|until)\b");
pattern!(DO, r"\bdo\b");
pattern!(END, r"\bend\b");
pattern!(CALL, r"([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*[?!]?)\s*\(");

const BUILTINS: &[&str] = &[
    "puts", "print", "p", "pp", "require", "require_relative", "load", "raise", "attr_accessor",
    "attr_reader", "attr_writer", "include", "extend", "prepend", "lambda", "proc", "loop",
    "format", "sprintf", "Integer", "Float", "String", "Array", "Hash", "rand", "sleep", "gets",
    "block_given?", "private", "protected", "public", "freeze",
];

pub struct RubyProfile;

impl LanguageProfile for RubyProfile {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn extract_imports(&self, text: &str) -> Vec<String> {
        let mut imports = Vec::new();
        for caps in REQUIRE.captures_iter(text) {
            let (Some(kind), Some(path)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let path = path.as_str();
            if kind.as_str() == "require_relative" && !path.starts_with('.') {
                push_unique(&mut imports, &format!("./{}", path));
            } else {
                push_unique(&mut imports, path);
            }
        }
        imports
    }

    fn extract_functions(&self, text: &str) -> Vec<FunctionDef> {
        let code = blank_non_code(text, Syntax::SCRIPT);
        let mut stack: Vec<Frame> = Vec::new();
        let mut functions = Vec::new();

        for (offset, line) in lines_with_offsets(&code) {
            for (at, event) in line_events(offset, line) {
                match event {
                    Event::Open(frame) => {
                        let frame = match frame {
                            Frame::Def { name, body_start, .. } => Frame::Def {
                                name: method_name(&stack, &name),
                                body_start,
                                nested: stack.iter().any(Frame::is_def),
                            },
                            other => other,
                        };
                        stack.push(frame);
                    }
                    Event::Endless { name, body } => {
                        if !stack.iter().any(Frame::is_def) {
                            let body = text.get(body).unwrap_or("").trim().to_string();
                            functions.push(FunctionDef::new(method_name(&stack, &name), body));
                        }
                    }
                    Event::End => {
                        if let Some(Frame::Def {
                            name,
                            body_start,
                            nested: false,
                        }) = stack.pop()
                        {
                            let body = text
                                .get(body_start..at)
                                .unwrap_or("")
                                .trim_matches(|c: char| c.is_whitespace() || c == ';')
                                .to_string();
                            functions.push(FunctionDef::new(name, body));
                        }
                    }
                }
            }
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
        let with_ext = |p: PathBuf| {
            if p.extension().is_some() {
                p
            } else {
                p.with_extension("rb")
            }
        };
        if import.starts_with("./") || import.starts_with("../") {
            let dir = current_file.parent()?;
            return existing_file(with_ext(dir.join(import)));
        }
        existing_file(with_ext(base.join("lib").join(import)))
            .or_else(|| existing_file(with_ext(base.join(import))))
    }

    fn function_line_number(&self, text: &str, name: &str) -> Option<usize> {
        let def_re = |method: &str| name_pattern(r"^\s*def\s+(?:self\.)?{}(?:[\s(;=]|$)", method);
        match name.rsplit_once('.') {
            Some((owner, method)) => {
                let owner_re = name_pattern(r"^\s*(?:class|module)\s+(?:\w+::)*{}\b", owner)?;
                let owner_line = scan::find_line(text, &owner_re)?;
                scan::find_line_after(text, &def_re(method)?, owner_line)
            }
            None => scan::find_line(text, &def_re(name)?),
        }
    }

    fn builtins(&self) -> &'static [&'static str] {
        BUILTINS
    }
}

enum Frame {
    Owner(String),
    Def {
        name: String,
        body_start: usize,
        nested: bool,
    },
    Block,
}

impl Frame {
    fn is_def(&self) -> bool {
        matches!(self, Frame::Def { .. })
    }
}

enum Event {
    Open(Frame),
    Endless {
        name: String,
        body: std::ops::Range<usize>,
    },
    End,
}

fn method_name(stack: &[Frame], method: &str) -> String {
    let owner = stack.iter().rev().find_map(|frame| match frame {
        Frame::Owner(name) => Some(name.as_str()),
        _ => None,
    });
    match owner {
        Some(owner) => format!("{}.{}", owner, method),
        None => method.to_string(),
    }
}

/// Keyword openers and `end`s of one code line, in offset order.
fn line_events(offset: usize, line: &str) -> Vec<(usize, Event)> {
    let trimmed = line.trim_start();
    let lead = offset + (line.len() - trimmed.len());
    let mut events = Vec::new();
    let mut loop_header = false;

    if let Some(caps) = DEF.captures(trimmed) {
        if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
            if let Some(endless) = ENDLESS_DEF.find(trimmed) {
                let eq = trimmed[..endless.end()].rfind('=').unwrap_or(endless.end());
                events.push((
                    lead,
                    Event::Endless {
                        name: name.as_str().trim_end_matches('=').to_string(),
                        body: lead + eq + 1..offset + line.len(),
                    },
                ));
                return events;
            }
            events.push((
                lead,
                Event::Open(Frame::Def {
                    name: name.as_str().to_string(),
                    body_start: lead + whole.end(),
                    nested: false,
                }),
            ));
        }
    } else if let Some(caps) = OWNER.captures(trimmed) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        events.push((lead, Event::Open(Frame::Owner(name.to_string()))));
    } else if let Some(caps) = BLOCK_START.captures(trimmed) {
        let keyword = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        loop_header = matches!(keyword, "while" | "until" | "for");
        events.push((lead, Event::Open(Frame::Block)));
    }

    for caps in ASSIGNED_BLOCK.captures_iter(line) {
        if let Some(keyword) = caps.get(1) {
            events.push((offset + keyword.start(), Event::Open(Frame::Block)));
        }
    }
    if !loop_header {
        for m in DO.find_iter(line) {
            events.push((offset + m.start(), Event::Open(Frame::Block)));
        }
    }
    for m in END.find_iter(line) {
        let before = line[..m.start()].chars().next_back();
        let after = line[m.end()..].chars().next();
        if matches!(before, Some('.') | Some(':')) || after == Some(':') {
            continue;
        }
        events.push((offset + m.start(), Event::End));
    }

    events.sort_by_key(|(at, _)| *at);
    events
}
