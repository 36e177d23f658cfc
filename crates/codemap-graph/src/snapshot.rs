use codemap_core::{CodeMapError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::state::GraphState;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    state: &'a GraphState,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    state: GraphState,
}

pub fn write_snapshot(path: &Path, state: &GraphState) -> Result<()> {
    let bytes = bincode::serde::encode_to_vec(
        SnapshotRef {
            version: SNAPSHOT_VERSION,
            state,
        },
        bincode::config::standard(),
    )
    .map_err(|e: bincode::error::EncodeError| CodeMapError::Persistence(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CodeMapError::file_io(parent, e))?;
    }
    fs::write(path, &bytes).map_err(|e| CodeMapError::file_io(path, e))?;
    info!(
        "Saved analyzer snapshot: {} files, {} bytes to {:?}",
        state.file_count(),
        bytes.len(),
        path
    );
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<GraphState> {
    let bytes = fs::read(path).map_err(|e| CodeMapError::file_io(path, e))?;
    let (snapshot, _): (Snapshot, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
            |e: bincode::error::DecodeError| CodeMapError::Persistence(e.to_string()),
        )?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(CodeMapError::Persistence(format!(
            "unsupported analyzer snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    info!(
        "Loaded analyzer snapshot: {} files from {:?}",
        snapshot.state.file_count(),
        path
    );
    Ok(snapshot.state)
}
