use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// A reader sees either the previous content or the new content, never a mix.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Atomically write several files as one step: every tempfile is written
/// and synced before any of them is renamed into place, so a write error
/// leaves all targets untouched.
///
/// If a later rename fails, targets already renamed are put back to their
/// previous content (or removed, if they did not exist) before the error is
/// returned.
pub fn atomic_write_all(files: &[(&Path, &[u8])]) -> Result<()> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, data) in files {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let dir = path.parent().unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        let previous = if path.is_file() {
            Some(std::fs::read(path)?)
        } else {
            None
        };
        staged.push((tmp, *path, previous));
    }

    let mut renamed: Vec<(&Path, Option<Vec<u8>>)> = Vec::with_capacity(staged.len());
    for (tmp, path, previous) in staged {
        if let Err(e) = tmp.persist(path) {
            for (done, previous) in renamed.into_iter().rev() {
                roll_back(done, previous.as_deref());
            }
            return Err(e.error.into());
        }
        renamed.push((path, previous));
    }
    Ok(())
}

fn roll_back(path: &Path, previous: Option<&[u8]>) {
    let restored = match previous {
        Some(data) => atomic_write(path, data),
        None => std::fs::remove_file(path).map_err(Into::into),
    };
    if let Err(e) = restored {
        tracing::warn!(path = %path.display(), error = %e, "failed to roll back partial write");
    }
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Read a file to a string, mapping "does not exist" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00-bootstrap.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chains/a3f7c8d1/latest.json");
        atomic_write(&path, b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn atomic_write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latest.json");
        atomic_write(&path, b"old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        // No stray tempfiles left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn atomic_write_all_writes_every_file() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("01-setup.json");
        let b = dir.path().join("latest.json");
        let data: &[u8] = b"{\"n\":1}";
        atomic_write_all(&[(a.as_path(), data), (b.as_path(), data)]).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }

    #[test]
    fn atomic_write_all_rolls_back_on_failed_rename() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("01-setup.json");
        let fresh = dir.path().join("02-new.json");
        let blocked = dir.path().join("latest.json");
        std::fs::write(&a, "old").unwrap();
        // A non-empty directory cannot be replaced by a file rename.
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), "x").unwrap();

        let data: &[u8] = b"new";
        let result = atomic_write_all(&[
            (a.as_path(), data),
            (fresh.as_path(), data),
            (blocked.as_path(), data),
        ]);
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "old");
        assert!(!fresh.exists());
        assert!(blocked.join("keep").is_file());
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b");
        ensure_dir(&path).unwrap();
        ensure_dir(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn read_optional_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_optional(&dir.path().join("nope.json")).unwrap().is_none());
    }
}
