//! Durable JSON document store
//!
//! The engine persists three independent JSON documents: the
//! workflow-history/performance ledger, the memory entry set, and the
//! inverted-index/pattern document. Each is loaded wholesale at startup
//! (missing or unreadable file => fresh empty structure) and rewritten
//! wholesale after mutating operations.
//!
//! Store failures must never crash the process: callers log the error and
//! keep operating on the in-memory state for that cycle.

use sdk::errors::EngineError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Load a JSON document, falling back to its default on any failure.
///
/// A corrupt or missing file starts fresh rather than aborting; the
/// condition is logged so the operator can investigate.
pub fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return T::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!("Could not parse {:?}, starting fresh: {}", path, e);
                T::default()
            }
        },
        Err(e) => {
            warn!("Could not read {:?}, starting fresh: {}", path, e);
            T::default()
        }
    }
}

/// Rewrite a JSON document wholesale.
pub fn save<T>(path: &Path, value: &T) -> Result<(), EngineError>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| EngineError::Storage(format!("Failed to create {:?}: {}", parent, e)))?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| EngineError::Storage(format!("Failed to serialize {:?}: {}", path, e)))?;

    fs::write(path, json)
        .map_err(|e| EngineError::Storage(format!("Failed to write {:?}: {}", path, e)))?;

    Ok(())
}

/// Save, logging and swallowing any error.
///
/// Used on the mutation paths where a failed write must not fail the
/// operation that triggered it.
pub fn save_best_effort<T>(path: &Path, value: &T)
where
    T: Serialize,
{
    if let Err(e) = save(path, value) {
        warn!("Failed to persist {:?}: {}", path, e);
    }
}
