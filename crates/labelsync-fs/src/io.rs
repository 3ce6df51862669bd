//! Atomic I/O operations with file locking
//!
//! Writers take an exclusive advisory lock on a sidecar `<file>.lock` file,
//! write to a temporary file in the same directory and rename it over the
//! target. Readers take a shared lock on the same sidecar, so a reader never
//! observes a half-written file and two writers never interleave.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn open_lock(path: &Path) -> Result<File> {
    let lock = lock_path(path);
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock)
        .map_err(|e| Error::io(&lock, e))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    Ok(())
}

/// Replace `path` with `content` through a temp file; caller holds the lock
fn replace_locked(path: &Path, content: &[u8]) -> Result<()> {
    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .sync_all()
        .map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "atomic write complete");
    Ok(())
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Blocks while another process holds the lock.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let lock_file = open_lock(path)?;
    lock_file
        .lock_exclusive()
        .map_err(|e| Error::lock(path, e))?;

    // Lock released when lock_file is dropped
    replace_locked(path, content)
}

/// Read-modify-write a text file under one exclusive lock.
///
/// `update` receives the current content (`None` if the file does not
/// exist) and returns the replacement. No other writer can run between the
/// read and the write.
pub fn update_text<E, F>(path: &Path, update: F) -> std::result::Result<(), E>
where
    F: FnOnce(Option<String>) -> std::result::Result<String, E>,
    E: From<Error>,
{
    ensure_parent(path)?;
    let lock_file = open_lock(path)?;
    lock_file
        .lock_exclusive()
        .map_err(|e| Error::lock(path, e))?;

    let current = match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(path, e).into()),
    };

    let content = update(current)?;
    replace_locked(path, content.as_bytes())?;
    Ok(())
}

/// Read text content from a file under a shared lock.
pub fn read_text(path: &Path) -> Result<String> {
    let lock_file = open_lock(path)?;
    lock_file.lock_shared().map_err(|e| Error::lock(path, e))?;
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_creates_parent_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.toml");

        write_text(&path, "version = \"1.0\"\n").unwrap();

        assert_eq!(read_text(&path).unwrap(), "version = \"1.0\"\n");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn write_atomic_replaces_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.toml");

        write_text(&path, "first").unwrap();
        write_text(&path, "second").unwrap();

        assert_eq!(read_text(&path).unwrap(), "second");
    }

    #[test]
    fn read_text_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_text(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn update_text_sees_missing_file_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.toml");

        update_text::<Error, _>(&path, |current| {
            assert_eq!(current, None);
            Ok("a\n".to_string())
        })
        .unwrap();

        assert_eq!(read_text(&path).unwrap(), "a\n");
    }

    #[test]
    fn update_text_builds_on_current_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        write_text(&path, "a\n").unwrap();

        update_text::<Error, _>(&path, |current| Ok(format!("{}b\n", current.unwrap_or_default())))
            .unwrap();

        assert_eq!(read_text(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn update_text_failure_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        write_text(&path, "keep").unwrap();

        let result = update_text(&path, |_| {
            Err(Error::UnsupportedFormat {
                extension: "x".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(read_text(&path).unwrap(), "keep");
    }

    #[test]
    fn concurrent_updates_are_serialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counter.txt");
        write_text(&path, "0").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    update_text::<Error, _>(&path, |current| {
                        let n: u32 = current.unwrap_or_default().trim().parse().unwrap();
                        Ok((n + 1).to_string())
                    })
                    .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(read_text(&path).unwrap(), "8");
    }

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("/tmp/registry.toml")),
            PathBuf::from("/tmp/registry.toml.lock")
        );
    }
}
