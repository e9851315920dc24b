//! Per-attempt staging directory

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{MarketplaceError, Result};

/// Private temporary directory owned by one install attempt
///
/// Removed by [`InstallWorkspace::close`] on the normal path and by `Drop`
/// on every other path (early return, panic, cancelled future).
#[derive(Debug)]
pub struct InstallWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl InstallWorkspace {
    /// Create `wmx_<name>_XXXXXX` under the system temp root
    pub fn create(component_name: &str) -> Result<Self> {
        Self::create_in(component_name, std::env::temp_dir())
    }

    /// Create the workspace under an explicit parent directory
    pub fn create_in(component_name: &str, parent: impl AsRef<Path>) -> Result<Self> {
        let parent = parent.as_ref();
        let dir = tempfile::Builder::new()
            .prefix(&format!("wmx_{component_name}_"))
            .tempdir_in(parent)
            .map_err(|e| MarketplaceError::io(parent, e))?;
        let path = dir.path().to_path_buf();

        tracing::debug!("Created install workspace {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace now, logging rather than returning failures
    pub fn close(mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => tracing::debug!("Removed install workspace {}", self.path.display()),
                Err(e) => tracing::warn!(
                    "Failed to remove install workspace {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}

impl Drop for InstallWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(
                    "Failed to remove install workspace {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let workspace = InstallWorkspace::create_in("Widget", root.path()).unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(path.join("file.txt"), "x").unwrap();

        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("wmx_Widget_"));

        workspace.close();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let workspace = InstallWorkspace::create_in("Widget", root.path()).unwrap();
            std::fs::create_dir_all(workspace.path().join("nested/deeper")).unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_parent_is_io_error() {
        let err = InstallWorkspace::create_in("Widget", "/definitely/not/a/dir").unwrap_err();
        assert_eq!(err.kind(), "io_failure");
    }
}
