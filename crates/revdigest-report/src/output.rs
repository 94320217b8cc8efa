//! Atomic report output.

use std::io::Write;
use std::path::{Path, PathBuf};

use revdigest_core::DigestError;
use tempfile::{Builder, NamedTempFile};
use tracing::debug;

/// A reserved output destination.
///
/// Preparing creates a temporary file next to the destination, so an
/// unwritable directory is detected before any work is done. Nothing appears
/// under the destination name until [`commit`](Self::commit) succeeds; a
/// dropped destination removes its temporary file. A new report gets the
/// usual `0o666` less umask; a replaced report keeps its permissions.
#[derive(Debug)]
pub struct OutputDestination {
    path: PathBuf,
    staging: NamedTempFile,
}

impl OutputDestination {
    /// Reserve `path` for writing.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Config`] if the destination directory does not
    /// exist or is not writable, or if `path` is a directory.
    pub fn prepare(path: &Path) -> Result<Self, DigestError> {
        if path.is_dir() {
            return Err(DigestError::Config(format!(
                "output path {} is a directory",
                path.display()
            )));
        }
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        #[cfg_attr(not(unix), allow(unused_mut))]
        let mut builder = Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let staging = builder.tempfile_in(dir).map_err(|e| {
            DigestError::Config(format!("cannot write output file {}: {e}", path.display()))
        })?;
        debug!(staging = %staging.path().display(), "reserved output");
        Ok(Self {
            path: path.to_path_buf(),
            staging,
        })
    }

    /// Final location of the report.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `contents` and move it into place, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Io`] if writing or renaming fails. The
    /// destination is left untouched in that case.
    pub fn commit(mut self, contents: &str) -> Result<PathBuf, DigestError> {
        self.staging.write_all(contents.as_bytes())?;
        self.staging.flush()?;
        if let Ok(existing) = std::fs::metadata(&self.path) {
            self.staging
                .as_file()
                .set_permissions(existing.permissions())?;
        }
        self.staging
            .persist(&self.path)
            .map_err(|e| DigestError::Io(e.error))?;
        Ok(self.path)
    }
}
