// src/fs/mock.rs

use super::DirectoryRemover;
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Remover that records every call instead of touching the disk.
///
/// Clones share the same call log, so a test can hand one clone to the
/// runner and inspect another.
#[derive(Debug, Clone, Default)]
pub struct RecordingRemover {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    fail: bool,
}

impl RecordingRemover {
    pub fn new() -> Self {
        Self::default()
    }

    /// A remover whose every call fails after being recorded.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl DirectoryRemover for RecordingRemover {
    fn remove_all(&self, path: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        if self.fail {
            return Err(anyhow!("refusing to remove {:?}", path));
        }
        Ok(())
    }
}
