// ABOUTME: Lexical scanning helpers shared by the language profiles
// ABOUTME: Skips strings and comments, matches braces, maps byte offsets to line numbers

use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Declares a lazily compiled, built-in pattern.
macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($re).expect("built-in pattern"));
    };
}
pub(crate) use pattern;

/// Words that look like calls or declarations to a lexical scan but are language keywords.
pub const CONTROL_KEYWORDS: &[&str] = &[
    "if", "else", "elif", "elsif", "for", "foreach", "while", "do", "switch", "case", "catch",
    "try", "return", "throw", "new", "delete", "sizeof", "typeof", "nameof", "function", "func",
    "def", "fn", "lambda", "with", "except", "using", "lock", "fixed", "synchronized", "when",
    "match", "await", "yield", "assert", "not", "and", "or", "in", "is", "defer", "go", "select",
    "super", "this", "unless", "until", "elseif", "default", "checked", "unchecked",
];

pub fn is_control_keyword(word: &str) -> bool {
    CONTROL_KEYWORDS.contains(&word)
}

/// Comment and string conventions of a language family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syntax {
    pub slash_comments: bool,
    pub block_comments: bool,
    pub hash_comments: bool,
    pub single_quote_strings: bool,
    pub backtick_strings: bool,
}

impl Syntax {
    pub const C_LIKE: Syntax = Syntax {
        slash_comments: true,
        block_comments: true,
        hash_comments: false,
        single_quote_strings: true,
        backtick_strings: false,
    };
    pub const GO: Syntax = Syntax {
        backtick_strings: true,
        ..Syntax::C_LIKE
    };
    pub const JAVASCRIPT: Syntax = Syntax::GO;
    pub const PHP: Syntax = Syntax {
        hash_comments: true,
        backtick_strings: true,
        ..Syntax::C_LIKE
    };
    pub const SCRIPT: Syntax = Syntax {
        slash_comments: false,
        block_comments: false,
        hash_comments: true,
        single_quote_strings: true,
        backtick_strings: false,
    };
}

/// Iterates the bytes of `text` that are code, skipping comments and string literals.
pub struct CodeBytes<'a> {
    bytes: &'a [u8],
    pos: usize,
    syntax: Syntax,
}

impl<'a> CodeBytes<'a> {
    pub fn new(text: &'a str, start: usize, syntax: Syntax) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: start,
            syntax,
        }
    }
}

impl Iterator for CodeBytes<'_> {
    type Item = (usize, u8);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.bytes;
        while self.pos < bytes.len() {
            let i = self.pos;
            let c = bytes[i];
            let next = bytes.get(i + 1).copied();

            if (self.syntax.slash_comments && c == b'/' && next == Some(b'/'))
                || (self.syntax.hash_comments && c == b'#')
            {
                self.pos = skip_line(bytes, i);
                continue;
            }
            if self.syntax.block_comments && c == b'/' && next == Some(b'*') {
                self.pos = skip_block_comment(bytes, i + 2);
                continue;
            }
            if c == b'"'
                || (c == b'\'' && self.syntax.single_quote_strings)
                || (c == b'`' && self.syntax.backtick_strings)
            {
                self.pos = skip_string(bytes, i + 1, c);
                continue;
            }

            self.pos = i + 1;
            return Some((i, c));
        }
        None
    }
}

fn skip_line(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| from + p)
        .unwrap_or(bytes.len())
}

fn skip_block_comment(bytes: &[u8], from: usize) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| rest.windows(2).position(|w| w == b"*/"))
        .map(|p| from + p + 2)
        .unwrap_or(bytes.len())
}

fn skip_string(bytes: &[u8], from: usize, quote: u8) -> usize {
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            // Only backtick literals may span lines; an unterminated quote stops at the newline.
            b'\n' if quote != b'`' => return j,
            c if c == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Copy of `text` where comment and string bytes are replaced by spaces.
/// Byte offsets and line breaks are preserved, so matches on the copy map back onto `text`.
pub fn blank_non_code(text: &str, syntax: Syntax) -> String {
    let mut out: Vec<u8> = text
        .bytes()
        .map(|b| if b == b'\n' { b'\n' } else { b' ' })
        .collect();
    for (i, c) in CodeBytes::new(text, 0, syntax) {
        out[i] = c;
    }
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

/// Brace nesting depth in front of every byte of a text.
pub struct BraceIndex {
    depth: Vec<u32>,
}

impl BraceIndex {
    pub fn new(text: &str, syntax: Syntax) -> Self {
        let mut depth = vec![0u32; text.len() + 1];
        let mut current = 0u32;
        let mut last = 0usize;
        for (i, c) in CodeBytes::new(text, 0, syntax) {
            depth[last..=i].fill(current);
            last = i + 1;
            match c {
                b'{' => current += 1,
                b'}' => current = current.saturating_sub(1),
                _ => {}
            }
        }
        depth[last..].fill(current);
        Self { depth }
    }

    pub fn depth_at(&self, offset: usize) -> u32 {
        self.depth.get(offset).copied().unwrap_or(0)
    }
}

/// Location of a function or type body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Whole body, braces included.
    pub span: Range<usize>,
    /// Contents between the braces, or the expression of an arrow body.
    pub inner: Range<usize>,
}

impl Body {
    pub fn contains(&self, offset: usize) -> bool {
        self.span.contains(&offset)
    }
}

/// Index of the `}` closing the `{` at `open`.
pub fn matching_brace(text: &str, open: usize, syntax: Syntax) -> Option<usize> {
    if text.as_bytes().get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in CodeBytes::new(text, open, syntax) {
        match c {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds the body that follows a declaration header starting at `from`.
///
/// Parentheses and brackets are skipped, so parameter lists and initializer lists never end
/// the header. A `;` or `}` at the outer level means the declaration has no body. `=>`
/// introduces either a brace block or an expression body.
pub fn body_after(text: &str, from: usize, syntax: Syntax) -> Option<Body> {
    let bytes = text.as_bytes();
    let mut nesting = 0i32;
    for (i, c) in CodeBytes::new(text, from, syntax) {
        match c {
            b'(' | b'[' => nesting += 1,
            b')' | b']' => nesting -= 1,
            b'{' if nesting <= 0 => {
                let close = matching_brace(text, i, syntax)?;
                return Some(Body {
                    span: i..close + 1,
                    inner: i + 1..close,
                });
            }
            b';' | b'}' if nesting <= 0 => return None,
            b'=' if nesting <= 0 && bytes.get(i + 1) == Some(&b'>') => {
                let mut start = i + 2;
                while start < bytes.len() && bytes[start].is_ascii_whitespace() {
                    start += 1;
                }
                if bytes.get(start) == Some(&b'{') {
                    let close = matching_brace(text, start, syntax)?;
                    return Some(Body {
                        span: start..close + 1,
                        inner: start + 1..close,
                    });
                }
                let end = expression_end(text, start, syntax);
                return Some(Body {
                    span: start..end,
                    inner: start..end,
                });
            }
            _ => {}
        }
    }
    None
}

/// End of an expression starting at `from`: the first `;`, `,` or newline outside any
/// nesting, or an unbalanced closing bracket.
pub fn expression_end(text: &str, from: usize, syntax: Syntax) -> usize {
    let mut nesting = 0i32;
    for (i, c) in CodeBytes::new(text, from, syntax) {
        match c {
            b'(' | b'[' | b'{' => nesting += 1,
            b')' | b']' | b'}' => {
                if nesting == 0 {
                    return i;
                }
                nesting -= 1;
            }
            b';' | b',' | b'\n' if nesting == 0 => return i,
            _ => {}
        }
    }
    text.len()
}

/// 1-based line number containing byte `offset`.
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// First 1-based line matching `pattern`.
pub fn find_line(text: &str, pattern: &Regex) -> Option<usize> {
    find_line_after(text, pattern, 0)
}

/// First 1-based line strictly after line `after` matching `pattern`.
pub fn find_line_after(text: &str, pattern: &Regex, after: usize) -> Option<usize> {
    text.lines()
        .enumerate()
        .skip(after)
        .find(|(_, line)| pattern.is_match(line))
        .map(|(i, _)| i + 1)
}

/// Compiles a per-name pattern, `{}` being replaced by the escaped name.
pub fn name_pattern(template: &str, name: &str) -> Option<Regex> {
    Regex::new(&template.replace("{}", &regex::escape(name))).ok()
}

/// Call names in `body` matched by `pattern`'s first group, in first-seen order, without
/// keywords, `builtins` or duplicates. Strings and comments are ignored.
pub fn collect_calls(body: &str, pattern: &Regex, syntax: Syntax, builtins: &[&str]) -> Vec<String> {
    let code = blank_non_code(body, syntax);
    let mut calls = Vec::new();
    for caps in pattern.captures_iter(&code) {
        let Some(m) = caps.get(1) else { continue };
        let name = m.as_str();
        if name.is_empty() || name.ends_with('.') || is_control_keyword(name) {
            continue;
        }
        if builtins.contains(&name) {
            continue;
        }
        push_unique(&mut calls, name);
    }
    calls
}

pub fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}

/// Leading whitespace width of a line, tabs counting as one column.
pub fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Lines of `text` with the byte offset each starts at.
pub fn lines_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        out.push((offset, line.trim_end_matches(['\n', '\r'])));
        offset += line.len();
    }
    out
}

pub fn existing_file(candidate: PathBuf) -> Option<PathBuf> {
    candidate.is_file().then_some(candidate)
}

pub fn existing_dir(candidate: PathBuf) -> Option<PathBuf> {
    candidate.is_dir().then_some(candidate)
}

/// Longest trailing run of `segments` that names an existing directory under `base`.
/// Module-qualified imports (`github.com/org/repo/pkg`) usually live at a suffix of their path.
pub fn dir_for_segments(base: &Path, segments: &[&str]) -> Option<PathBuf> {
    (0..segments.len()).find_map(|skip| {
        let rest = &segments[skip..];
        if rest.iter().any(|s| s.is_empty() || *s == "..") {
            return None;
        }
        existing_dir(rest.iter().fold(base.to_path_buf(), |acc, s| acc.join(s)))
    })
}
