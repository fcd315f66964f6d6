use crate::error::{Result, SpecflowError};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// A write interrupted midway leaves the previous content in place.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SpecflowError::file(parent, e))?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SpecflowError::file(dir, e))?;
    tmp.write_all(data)?;
    tmp.persist(path)
        .map_err(|e| SpecflowError::file(path, e.error))?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| SpecflowError::file(path, e))?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Read a UTF-8 file, mapping failures to a path-carrying error.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| SpecflowError::file(path, e))
}

/// Read a file if it exists. Missing files are `None`; other failures are errors.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SpecflowError::file(path, e)),
    }
}

/// Like `read_optional`, but invalid UTF-8 is replaced instead of failing.
pub fn read_optional_lossy(path: &Path) -> Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SpecflowError::file(path, e)),
    }
}

/// Append `text` to a file, creating it if needed. Goes through `atomic_write`.
pub fn append_text(path: &Path, text: &str) -> Result<()> {
    let mut content = read_optional(path)?.unwrap_or_default();
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(text);
    atomic_write(path, content.as_bytes())
}
