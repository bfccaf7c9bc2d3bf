//! File helpers shared by the record and tag stores.

use std::io::ErrorKind;
use std::path::Path;

use dockyard_common::error::{DockyardError, Result};

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> DockyardError {
    DockyardError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn create_dir_all(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| io_error(path, e))
}

/// Reads a file, mapping a missing file to `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

/// Writes `bytes` to a `.tmp` sibling, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    std::fs::write(tmp, bytes).map_err(|e| io_error(tmp, e))?;
    std::fs::rename(tmp, path).map_err(|e| io_error(path, e))
}

/// Lists the names of the subdirectories of `dir`, sorted.
pub(crate) fn subdirectories(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(dir, e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        if entry.file_type().map_err(|e| io_error(&entry.path(), e))?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("config.json");
        write_atomic(&target, b"{}").expect("write");
        write_atomic(&target, b"{\"a\":1}").expect("overwrite");

        assert_eq!(std::fs::read(&target).expect("read"), b"{\"a\":1}");
        assert!(!dir.path().join("config.json.tmp").exists());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(read_optional(&dir.path().join("absent")).expect("read").is_none());
    }

    #[test]
    fn subdirectories_skip_files_and_sort() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("b")).expect("mkdir");
        std::fs::create_dir(dir.path().join("a")).expect("mkdir");
        std::fs::write(dir.path().join("file"), b"").expect("write");
        assert_eq!(subdirectories(dir.path()).expect("list"), vec!["a", "b"]);
    }

    #[test]
    fn subdirectories_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(subdirectories(&dir.path().join("nope")).expect("list").is_empty());
    }
}
