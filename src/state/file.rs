//! File-backed state client.
//!
//! The state is small (a couple of timestamps per area) but written after
//! every slot, so the write path is built to never leave a torn file behind:
//! serialize, write to a temp file in the same directory, fsync, atomically
//! rename over the target, fsync the directory. An advisory lock file keeps
//! concurrent processes from interleaving their replace cycles.

use crate::state::{State, StateClient, StateError};
use fd_lock::RwLock;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Maximum allowed state file size to prevent memory exhaustion on load.
pub const MAX_STATE_FILE_SIZE: u64 = 1024 * 1024;

/// Reads and replaces the state JSON file on local disk.
pub struct FileStateClient {
    state_file_path: PathBuf,
}

impl FileStateClient {
    /// Create a client for the given state file path.
    pub fn new<P: Into<PathBuf>>(state_file_path: P) -> Self {
        Self {
            state_file_path: state_file_path.into(),
        }
    }

    fn lock_file(&self) -> Result<std::fs::File, StateError> {
        let lock_path = self.state_file_path.with_extension("lock");
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StateError::Lock(format!("failed to create lock file: {e}")))
    }
}

impl StateClient for FileStateClient {
    fn read_state(&self) -> Result<Option<State>, StateError> {
        let path = &self.state_file_path;
        if !path.exists() {
            debug!(path = %path.display(), "No state file found, starting fresh");
            return Ok(None);
        }

        let lock_file = self.lock_file()?;
        let lock = RwLock::new(lock_file);
        let _guard = lock
            .read()
            .map_err(|e| StateError::Lock(format!("failed to acquire read lock: {e}")))?;

        let metadata = std::fs::metadata(path).map_err(|e| StateError::Io(e.to_string()))?;
        if metadata.len() > MAX_STATE_FILE_SIZE {
            return Err(StateError::TooLarge {
                size: metadata.len(),
                max: MAX_STATE_FILE_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| StateError::Io(e.to_string()))?;
        let state: State = serde_json::from_str(&contents).map_err(|e| {
            warn!(error = %e, "Failed to deserialize state file");
            StateError::Deserialization(e.to_string())
        })?;

        info!(
            path = %path.display(),
            areas = state.last_retrieved_generation_time.len(),
            exchanges = state.last_retrieved_exchange_time.len(),
            "State loaded"
        );
        Ok(Some(state))
    }

    fn store_state(&self, state: &State) -> Result<(), StateError> {
        let path = &self.state_file_path;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::Io(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        let lock_file = self.lock_file()?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| StateError::Lock(format!("failed to acquire write lock: {e}")))?;

        let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| StateError::Io(format!("failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| StateError::Io(format!("failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| StateError::Io(format!("failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| StateError::Io(format!("failed to sync temp file: {e}")))?;

        temp_file
            .persist(path)
            .map_err(|e| StateError::Io(format!("failed to persist temp file: {e}")))?;

        // Make the rename itself durable.
        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        debug!(path = %path.display(), "State stored");
        Ok(())
    }
}
