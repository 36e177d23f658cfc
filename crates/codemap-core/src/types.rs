use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::language::Language;

/// Identity of a source file plus its derived language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    /// Extension including the leading dot, empty when the file has none.
    pub extension: String,
    pub language: Language,
}

impl FileInfo {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        let language = Language::from_path(&path);
        Self {
            path,
            extension,
            language,
        }
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// A function as a language profile sees it: a name and the raw body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub body: String,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    /// `<file path>:<name>`, unique across the analyzed tree.
    pub full_name: String,
    pub file_path: PathBuf,
    pub line_number: Option<usize>,
    pub calls: Vec<String>,
    pub body: String,
}

impl FunctionInfo {
    pub fn new(
        file_path: &Path,
        def: FunctionDef,
        line_number: Option<usize>,
        calls: Vec<String>,
    ) -> Self {
        Self {
            full_name: function_key(file_path, &def.name),
            name: def.name,
            file_path: file_path.to_path_buf(),
            line_number,
            calls,
            body: def.body,
        }
    }
}

pub fn function_key(file_path: &Path, name: &str) -> String {
    format!("{}:{}", file_path.display(), name)
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFunction {
    pub name: String,
    pub line_number: Option<usize>,
}

/// One node of a file or call dependency tree. Built per query, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTree {
    pub node_type: NodeKind,
    pub name: String,
    /// File path for file nodes, `<file path>:<name>` for function nodes.
    pub full_path: String,
    pub line_number: Option<usize>,
    pub is_cyclic: bool,
    #[serde(default)]
    pub children: Vec<DependencyTree>,
    #[serde(default)]
    pub functions: Vec<DependencyFunction>,
}

impl DependencyTree {
    pub fn file(path: &Path) -> Self {
        Self {
            node_type: NodeKind::File,
            name: file_name_of(path),
            full_path: path.display().to_string(),
            line_number: None,
            is_cyclic: false,
            children: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn function(file_path: &Path, name: &str) -> Self {
        Self {
            node_type: NodeKind::Function,
            name: name.to_string(),
            full_path: function_key(file_path, name),
            line_number: None,
            is_cyclic: false,
            children: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn cyclic(mut self, is_cyclic: bool) -> Self {
        self.is_cyclic = is_cyclic;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Longest root-to-leaf edge count.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Nodes in pre-order, the root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Every node in the tree whose `name` matches.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a DependencyTree> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a DependencyTree>) {
        if self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.collect_named(name, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_info_derives_language() {
        let info = FileInfo::from_path("/repo/src/App.TSX");
        assert_eq!(info.extension, ".tsx");
        assert_eq!(info.language, Language::TypeScript);
        assert_eq!(info.file_name(), "App.TSX");
    }

    #[test]
    fn function_full_name_joins_path_and_name() {
        let info = FunctionInfo::new(
            Path::new("/repo/a.go"),
            FunctionDef::new("Foo", "{}"),
            Some(3),
            vec![],
        );
        assert_eq!(info.full_name, "/repo/a.go:Foo");
    }

    #[test]
    fn tree_json_shape() {
        let mut root = DependencyTree::file(Path::new("/repo/a.go"));
        root.functions.push(DependencyFunction {
            name: "Foo".into(),
            line_number: Some(3),
        });
        root.children.push(DependencyTree::file(Path::new("/repo/b.go")).cyclic(true));

        let value = serde_json::to_value(&root).unwrap();
        assert_eq!(value["node_type"], "file");
        assert_eq!(value["name"], "a.go");
        assert!(value["line_number"].is_null());
        assert_eq!(value["functions"][0]["line_number"], 3);
        assert_eq!(value["children"][0]["is_cyclic"], true);

        let back: DependencyTree = serde_json::from_value(value).unwrap();
        assert_eq!(back, root);
        assert_eq!(back.depth(), 1);
        assert_eq!(back.node_count(), 2);
    }
}
