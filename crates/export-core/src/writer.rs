use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{ExportError, Result};

/// What a write did to the file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Persists exported artifacts below an output root
///
/// Payloads are written to a temporary file in the target directory and then
/// renamed over the final name, so a reader never sees a partial file.
#[derive(Debug, Clone)]
pub struct ExportWriter {
    root: PathBuf,
    skip_unchanged: bool,
}

impl ExportWriter {
    /// Create the output root if needed
    pub fn new(root: impl Into<PathBuf>, skip_unchanged: bool) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            ExportError::Io(format!(
                "cannot create output directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self {
            root,
            skip_unchanged,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative export path
    pub fn resolve(&self, relative: &Path) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        let mut any = false;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    any = true;
                }
                Component::CurDir => {}
                _ => {
                    return Err(ExportError::Structure(format!(
                        "export path {} must stay inside the output directory",
                        relative.display()
                    )))
                }
            }
        }

        if !any {
            return Err(ExportError::Structure("empty export path".to_string()));
        }
        Ok(resolved)
    }

    /// Write `bytes` to `relative`, creating parent directories
    pub fn write(&self, relative: &Path, bytes: &[u8]) -> Result<WriteOutcome> {
        let target = self.resolve(relative)?;
        let parent = target
            .parent()
            .ok_or_else(|| ExportError::Structure(format!("{} has no parent", target.display())))?;

        fs::create_dir_all(parent).map_err(|e| io_error("create directory", parent, e))?;

        // Permissions of the file being replaced, if any
        let existing = match fs::metadata(&target) {
            Ok(meta) if meta.is_dir() => {
                return Err(ExportError::Io(format!(
                    "{} is a directory",
                    target.display()
                )))
            }
            Ok(meta) => {
                if self.skip_unchanged && meta.len() == bytes.len() as u64 {
                    let current = fs::read(&target).map_err(|e| io_error("read", &target, e))?;
                    if current == bytes {
                        return Ok(WriteOutcome::Unchanged);
                    }
                }
                Some(meta.permissions())
            }
            Err(_) => None,
        };

        let mut temp =
            temp_file_in(parent).map_err(|e| io_error("create temporary file in", parent, e))?;
        temp.write_all(bytes)
            .map_err(|e| io_error("write", temp.path(), e))?;
        if let Some(permissions) = &existing {
            temp.as_file()
                .set_permissions(permissions.clone())
                .map_err(|e| io_error("set permissions on", temp.path(), e))?;
        }
        temp.persist(&target)
            .map_err(|e| io_error("replace", &target, e.error))?;

        Ok(if existing.is_some() {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        })
    }
}

/// Hidden temporary file next to the target
///
/// On unix it is opened with mode 0666 so the process umask decides the
/// final mode, as it does for `fs::write`.
fn temp_file_in(parent: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".cfexport-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(parent)
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> ExportError {
    ExportError::Io(format!("cannot {} {}: {}", action, path.display(), err))
}
