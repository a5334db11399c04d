//! Whole-file replacement through a synced temporary file in the target directory

use crate::error::{Error, Result};

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// `<path>.<suffix>`, keeping the full original file name
pub fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Write and sync `contents` to a uniquely named temporary file next to `path`.
///
/// The temporary file is removed when dropped without being persisted.
fn stage(path: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir).map_err(|e| Error::write(&dir, e))?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| Error::write(&dir, e))?;
    temp.write_all(contents).map_err(|e| Error::write(temp.path(), e))?;
    temp.as_file().sync_all().map_err(|e| Error::write(temp.path(), e))?;
    Ok(temp)
}

fn persist(temp: NamedTempFile, path: &Path) -> io::Result<()> {
    temp.persist(path).map(|_| ()).map_err(|e| e.error)
}

/// Write `contents` to a temporary file, then rename it over `path`.
///
/// Readers see either the old file or the complete new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let temp = stage(path, contents)?;
    persist(temp, path).map_err(|e| Error::write(path, e))
}

/// Replace `path` with `contents`, keeping the previous file as `<path>.backup`.
///
/// The new content is fully written and synced before the old file moves.
/// If the final rename fails the backup is moved back, so `path` keeps its
/// previous content. Returns the backup path when a previous file existed.
pub fn replace_with_backup(path: &Path, contents: &[u8]) -> Result<Option<PathBuf>> {
    replace_with(path, contents, persist)
}

fn replace_with(
    path: &Path, contents: &[u8], install: impl FnOnce(NamedTempFile, &Path) -> io::Result<()>,
) -> Result<Option<PathBuf>> {
    let temp = stage(path, contents)?;
    let backup = sibling(path, "backup");

    let had_previous = path.exists();
    if had_previous {
        fs::rename(path, &backup).map_err(|e| Error::write(&backup, e))?;
    }

    if let Err(e) = install(temp, path) {
        if had_previous && let Err(restore) = fs::rename(&backup, path) {
            tracing::error!(
                backup = %backup.display(),
                error = %restore,
                "Failed to restore previous file from backup"
            );
        }
        return Err(Error::write(path, e));
    }

    Ok(had_previous.then_some(backup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_sibling_keeps_extension() {
        let path = Path::new("/data/activity_log.json");
        assert_eq!(sibling(path, "backup"), PathBuf::from("/data/activity_log.json.backup"));
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("exports");
        let path = dir.join("deltas.json");

        write_atomic(&path, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(entries(&dir), vec!["deltas.json"]);
    }

    #[test]
    fn test_replace_without_previous_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.json");

        let backup = replace_with_backup(&path, b"first").unwrap();

        assert!(backup.is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
        assert!(!sibling(&path, "backup").exists());
    }

    #[test]
    fn test_replace_keeps_single_backup() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.json");

        replace_with_backup(&path, b"first").unwrap();
        let backup = replace_with_backup(&path, b"second").unwrap().unwrap();
        assert_eq!(fs::read_to_string(&backup).unwrap(), "first");

        replace_with_backup(&path, b"third").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "third");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "second");
        assert_eq!(entries(temp.path()), vec!["activity_log.json", "activity_log.json.backup"]);
    }

    #[test]
    fn test_stale_tmp_entry_does_not_block_saves() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.json");
        fs::write(&path, "valid").unwrap();

        let stale = sibling(&path, "tmp");
        fs::create_dir(&stale).unwrap();
        fs::write(stale.join("keep"), "x").unwrap();

        replace_with_backup(&path, b"replacement").unwrap();
        write_atomic(&path, b"again").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "again");
        assert_eq!(fs::read_to_string(sibling(&path, "backup")).unwrap(), "valid");
    }

    #[test]
    fn test_failed_install_restores_previous_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("activity_log.json");
        fs::write(&path, "valid").unwrap();

        let result = replace_with(&path, b"replacement", |_, target| {
            assert!(!target.exists());
            Err(io::Error::other("disk full"))
        });

        assert!(matches!(result, Err(Error::Write { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "valid");
        assert!(!sibling(&path, "backup").exists());
        assert_eq!(entries(temp.path()), vec!["activity_log.json"]);
    }

    #[test]
    fn test_failed_stage_leaves_previous_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not_a_dir");
        fs::write(&blocker, "file").unwrap();
        let path = blocker.join("activity_log.json");

        let result = replace_with_backup(&path, b"replacement");

        assert!(matches!(result, Err(Error::Write { .. })));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "file");
    }
}
