//! Dependency tree construction over a [`GraphState`].
//!
//! Each root-to-leaf path carries its own visited set, so a node reached along two paths is
//! expanded twice, while a node recurring on its own path becomes a cyclic leaf. Depth bounds
//! guarantee termination either way.

use codemap_core::{function_key, CallResolution, DependencyFunction, DependencyTree};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::state::GraphState;

/// Bounds and policies for one tree query.
#[derive(Debug, Clone, Copy)]
pub struct TreeLimits {
    pub max_depth: usize,
    pub resolution: CallResolution,
}

pub fn file_tree(state: &GraphState, path: &Path, max_depth: usize) -> DependencyTree {
    build_file(state, path, &HashSet::new(), 0, max_depth)
}

pub fn function_tree(
    state: &GraphState,
    file: &Path,
    name: &str,
    limits: TreeLimits,
) -> DependencyTree {
    build_function(state, file, name, &HashSet::new(), 0, limits)
}

fn build_file(
    state: &GraphState,
    path: &Path,
    visited: &HashSet<PathBuf>,
    level: usize,
    max_depth: usize,
) -> DependencyTree {
    let seen = visited.contains(path);
    if level > max_depth || seen {
        return DependencyTree::file(path).cyclic(seen);
    }

    let mut visited = visited.clone();
    visited.insert(path.to_path_buf());

    let mut tree = DependencyTree::file(path);
    if let Some(dependencies) = state.file_dependencies.get(path) {
        tree.children = dependencies
            .iter()
            .map(|dep| build_file(state, dep, &visited, level + 1, max_depth))
            .collect();
    }
    if let Some(functions) = state.file_functions.get(path) {
        tree.functions = functions
            .iter()
            .map(|f| DependencyFunction {
                name: f.name.clone(),
                line_number: f.line_number,
            })
            .collect();
    }
    tree
}

fn build_function(
    state: &GraphState,
    file: &Path,
    name: &str,
    visited: &HashSet<String>,
    level: usize,
    limits: TreeLimits,
) -> DependencyTree {
    let key = function_key(file, name);
    let seen = visited.contains(&key);
    if level > limits.max_depth || seen {
        return DependencyTree::function(file, name).cyclic(seen);
    }

    let mut visited = visited.clone();
    visited.insert(key);

    let mut tree = DependencyTree::function(file, name);
    let Some(function) = state.function(file, name) else {
        return tree;
    };
    tree.line_number = function.line_number;
    for call in &function.calls {
        if let Some(target) = state.resolve_call(call, file, limits.resolution) {
            tree.children.push(build_function(
                state,
                &target.file_path,
                &target.name,
                &visited,
                level + 1,
                limits,
            ));
        }
    }
    tree
}
