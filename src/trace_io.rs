//! Trace save/load to a run directory (JSON).

use std::path::Path;

use tracing::instrument;

use crate::types::ExecutionTrace;

/// Default filename for a trace under a run directory.
pub const TRACE_FILENAME: &str = "trace.json";

/// Saves a trace to `path` as pretty-printed JSON.
#[instrument(level = "trace", skip(path, trace))]
pub fn save_trace(path: &Path, trace: &ExecutionTrace) -> Result<(), std::io::Error> {
  let json = serde_json::to_string_pretty(trace)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)
}

/// Loads a trace from `path`. Returns error if file is missing or invalid JSON.
#[instrument(level = "trace", skip(path))]
pub fn load_trace(path: &Path) -> Result<ExecutionTrace, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
