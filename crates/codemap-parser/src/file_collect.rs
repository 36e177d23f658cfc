use codemap_core::{is_supported_path, AnalyzerConfig, CodeMapError, Result, ScanFailure};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rules deciding which files of a tree take part in analysis and indexing.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Directory names pruned wherever they occur below the root.
    pub skip_dirs: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from(&AnalyzerConfig::default())
    }
}

impl From<&AnalyzerConfig> for DiscoveryOptions {
    fn from(config: &AnalyzerConfig) -> Self {
        Self {
            skip_dirs: config.skip_dirs.clone(),
            respect_gitignore: config.respect_gitignore,
        }
    }
}

/// Outcome of a discovery walk.
#[derive(Debug, Clone, Default)]
pub struct SourceFiles {
    /// Supported source files, sorted by path.
    pub files: Vec<PathBuf>,
    /// Entries the walker could not read. Their contents are missing from `files`.
    pub failures: Vec<ScanFailure>,
}

/// Supported source files under `root`.
///
/// Hidden files and directories are skipped, as are directories named in `skip_dirs`.
/// Entries that cannot be read do not stop the walk; they are reported in `failures`.
pub fn collect_source_files(root: &Path, options: &DiscoveryOptions) -> Result<SourceFiles> {
    info!("Collecting source files from: {:?}", root);
    if !root.is_dir() {
        return Err(CodeMapError::file_io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "root is not a directory"),
        ));
    }
    debug!(
        "Discovery options: skip_dirs={:?}, respect_gitignore={}",
        options.skip_dirs, options.respect_gitignore
    );

    let skip_dirs = options.skip_dirs.clone();
    let mut walker_builder = WalkBuilder::new(root);
    walker_builder
        .hidden(true)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .git_global(false)
        .ignore(options.respect_gitignore)
        .parents(options.respect_gitignore)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| skip_dirs.iter().any(|skip| skip == name)))
        });

    let mut paths = Vec::new();
    let mut failures = Vec::new();
    let mut total_files = 0usize;

    for dent in walker_builder.build() {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                warn!("Walker error: {}", e);
                let path = error_path(&e).unwrap_or(root);
                failures.push(ScanFailure::new(path, e.to_string()));
                continue;
            }
        };
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        total_files += 1;

        let path = dent.path();
        if is_supported_path(path) {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    failures.sort_by(|a, b| a.path.cmp(&b.path));

    info!(
        "File collection complete: {} files found, {} supported, {} unreadable",
        total_files,
        paths.len(),
        failures.len()
    );
    Ok(SourceFiles {
        files: paths,
        failures,
    })
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}
