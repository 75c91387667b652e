use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::error::{GenFillError, Result};

/// Where transient image files live for the duration of one step.
#[derive(Debug, Clone, Default)]
pub struct StagingArea {
    dir: Option<PathBuf>,
}

impl StagingArea {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn system() -> Self {
        Self::default()
    }

    /// Creates a uniquely named, empty file ending in `name`.
    pub fn create(&self, name: &str) -> Result<StagedFile> {
        let suffix = format!("-{}", name);
        let mut builder = Builder::new();
        builder.prefix("genfill-").suffix(&suffix);

        let file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| GenFillError::host(format!("failed to create staging file: {}", e)))?;

        log::debug!("Staged {}", file.path().display());
        Ok(StagedFile { file })
    }
}

/// A staging file that is removed on `close` or, failing that, on drop.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        tokio::fs::write(self.path(), bytes).await.map_err(|e| {
            GenFillError::host(format!("failed to write {}: {}", self.path().display(), e))
        })
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(self.path()).await.map_err(|e| {
            GenFillError::host(format!("failed to read {}: {}", self.path().display(), e))
        })
    }

    pub fn close(self) {
        let path = self.path().to_path_buf();
        if let Err(e) = self.file.close() {
            log::warn!("Failed to remove staging file {}: {}", path.display(), e);
        }
    }
}
