use codemap_core::{CallResolution, FunctionInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub dependencies: BTreeSet<PathBuf>,
    pub functions: Vec<FunctionInfo>,
}

/// The analyzer's three maps. Ordered collections keep tree children and first-match call
/// resolution deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphState {
    pub file_dependencies: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    pub function_files: BTreeMap<String, PathBuf>,
    pub file_functions: BTreeMap<PathBuf, Vec<FunctionInfo>>,
}

impl GraphState {
    pub fn insert(&mut self, analysis: FileAnalysis) {
        for function in &analysis.functions {
            self.function_files
                .insert(function.full_name.clone(), analysis.path.clone());
        }
        self.file_dependencies
            .insert(analysis.path.clone(), analysis.dependencies);
        self.file_functions.insert(analysis.path, analysis.functions);
    }

    pub fn file_count(&self) -> usize {
        self.file_functions.len()
    }

    pub fn function(&self, file: &Path, name: &str) -> Option<&FunctionInfo> {
        self.file_functions
            .get(file)?
            .iter()
            .find(|f| f.name == name)
    }

    /// Function a call name refers to, looking in `current_file` first.
    pub fn resolve_call(
        &self,
        call: &str,
        current_file: &Path,
        resolution: CallResolution,
    ) -> Option<&FunctionInfo> {
        if let Some(local) = self.function(current_file, call) {
            return Some(local);
        }

        let mut candidates = self
            .file_functions
            .iter()
            .filter(|(file, _)| file.as_path() != current_file)
            .flat_map(|(_, functions)| functions.iter())
            .filter(|f| f.name == call);

        match resolution {
            CallResolution::FirstMatch => candidates.next(),
            CallResolution::Strict => {
                let first = candidates.next()?;
                if candidates.next().is_some() {
                    debug!("Ambiguous call {} from {:?} left unresolved", call, current_file);
                    return None;
                }
                Some(first)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemap_core::FunctionDef;

    fn info(file: &str, name: &str, calls: &[&str]) -> FunctionInfo {
        FunctionInfo::new(
            Path::new(file),
            FunctionDef::new(name, ""),
            Some(1),
            calls.iter().map(|c| c.to_string()).collect(),
        )
    }

    fn state() -> GraphState {
        let mut state = GraphState::default();
        for (file, names) in [
            ("/r/a.go", vec!["main", "dup"]),
            ("/r/b.go", vec!["dup", "only_b"]),
            ("/r/c.go", vec!["dup"]),
        ] {
            state.insert(FileAnalysis {
                path: PathBuf::from(file),
                dependencies: BTreeSet::new(),
                functions: names.into_iter().map(|n| info(file, n, &[])).collect(),
            });
        }
        state
    }

    #[test]
    fn local_definitions_win() {
        let state = state();
        let found = state
            .resolve_call("dup", Path::new("/r/c.go"), CallResolution::Strict)
            .unwrap();
        assert_eq!(found.file_path, Path::new("/r/c.go"));
    }

    #[test]
    fn first_match_scans_files_in_path_order() {
        let state = state();
        let found = state
            .resolve_call("dup", Path::new("/r/x.go"), CallResolution::FirstMatch)
            .unwrap();
        assert_eq!(found.file_path, Path::new("/r/a.go"));
    }

    #[test]
    fn strict_refuses_ambiguous_names() {
        let state = state();
        assert!(state
            .resolve_call("dup", Path::new("/r/x.go"), CallResolution::Strict)
            .is_none());
        let unique = state
            .resolve_call("only_b", Path::new("/r/a.go"), CallResolution::Strict)
            .unwrap();
        assert_eq!(unique.full_name, "/r/b.go:only_b");
        assert!(state
            .resolve_call("missing", Path::new("/r/a.go"), CallResolution::FirstMatch)
            .is_none());
    }

    #[test]
    fn insert_indexes_functions_by_full_name() {
        let state = state();
        assert_eq!(state.file_count(), 3);
        assert_eq!(
            state.function_files.get("/r/b.go:only_b"),
            Some(&PathBuf::from("/r/b.go"))
        );
    }
}
