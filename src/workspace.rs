//! Per-job temporary workspace for intermediate PDFs

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::input::InputFile;

/// A private directory owned by one merge job.
///
/// The directory and everything in it is removed when the workspace is
/// closed or dropped, including when the job unwinds.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under the system temp dir, or under `root` if given.
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docmerge-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!("Created temporary workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the intermediate PDF for the input at `index`
    pub fn pdf_path_for(&self, index: usize, input: &InputFile) -> PathBuf {
        self.dir.path().join(format!("{:03}-{}.pdf", index + 1, input.stem()))
    }

    /// Working directory for the converter of the input at `index`
    pub fn scratch_dir_for(&self, index: usize) -> std::io::Result<PathBuf> {
        let dir = self.dir.path().join(format!("{:03}-out", index + 1));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove the workspace. Failure is logged and otherwise ignored.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed temporary workspace {}", path.display()),
            Err(e) => warn!("Could not fully remove temporary workspace {}: {}", path.display(), e),
        }
    }
}
