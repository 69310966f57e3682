// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Removes a run's scratch directory once the run is over.
pub trait DirectoryRemover: Send + Sync + Debug {
    /// Remove `path` and everything under it.
    ///
    /// Removing a path that no longer exists must succeed.
    fn remove_all(&self, path: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealDirectoryRemover;

impl DirectoryRemover for RealDirectoryRemover {
    fn remove_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing directory {:?}", path)),
        }
    }
}

/// Create a fresh scratch directory named `<prefix>XXXXXX` inside `parent`.
///
/// On unix the directory is made world-readable (0755): the external tool may
/// bind-mount paths below it into containers, which fails on the 0700 default.
/// The caller owns the directory from here on.
pub fn make_scratch_dir(parent: &Path, prefix: &str) -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(parent)
        .with_context(|| format!("creating scratch directory in {:?}", parent))?;

    let path = dir.keep();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("setting permissions on {:?}", path))?;
    }

    Ok(path)
}
