//! Cache Directory Management
//! Creates the per-node on-disk cache tree and verifies the process can
//! write everywhere inside it. Each POSIX errno family gets its own
//! diagnostic so a misconfigured mount is identifiable from the log alone.

use crate::domain::constants::CACHE_DIR_MODE;
use crate::domain::{DomainError, Result};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Create every missing ancestor of `path` with mode rwx/rwx/r-x, tolerating
/// components that already exist, then verify write access across the whole
/// tree.
pub fn make_directory(path: &str) -> Result<()> {
    let mut current = PathBuf::new();
    for component in Path::new(path).components() {
        current.push(component);
        if current.as_os_str().is_empty() || current == Path::new("/") {
            continue;
        }
        match fs::create_dir(&current) {
            Ok(()) => {
                trace!(path = %current.display(), "created cache directory component");
                if let Err(e) =
                    fs::set_permissions(&current, fs::Permissions::from_mode(CACHE_DIR_MODE))
                {
                    warn!(path = %current.display(), error = %e, "failed to set cache directory mode");
                }
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                trace!(path = %current.display(), "cache directory component already exists");
            }
            Err(e) => {
                warn_mkdir_failure(&current, &e);
                return Err(DomainError::Filesystem {
                    path: current.display().to_string(),
                    detail: e.to_string(),
                });
            }
        }
    }

    check_write_access(Path::new(path))
}

/// Recursively verify that every entry under `path` can be overwritten by
/// this process (or one of its children).
pub fn check_write_access(path: &Path) -> Result<()> {
    let entries = fs::read_dir(path).map_err(|e| {
        warn_opendir_failure(path, &e);
        DomainError::Filesystem {
            path: path.display().to_string(),
            detail: e.to_string(),
        }
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| DomainError::Filesystem {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        let full = entry.path();
        if !is_writable(&full) {
            warn!(
                path = %full.display(),
                "cache entry cannot be overwritten by the device manager process"
            );
            return Err(DomainError::Filesystem {
                path: full.display().to_string(),
                detail: "no write access".to_string(),
            });
        }
        if entry
            .file_type()
            .map(|t| t.is_dir() && !t.is_symlink())
            .unwrap_or(false)
        {
            check_write_access(&full)?;
        }
    }
    Ok(())
}

fn is_writable(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(cpath) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(cpath.as_ptr(), libc::W_OK) == 0 }
}

fn warn_mkdir_failure(path: &Path, e: &std::io::Error) {
    let path = path.display();
    match e.raw_os_error() {
        Some(libc::ENOENT) => {
            warn!(%path, "failed to create cache directory: non-existent root directory")
        }
        Some(libc::EACCES) => {
            warn!(%path, "failed to create cache directory: check your write permissions")
        }
        Some(libc::ENOTDIR) => {
            warn!(%path, "failed to create cache directory: a path component is not a directory")
        }
        Some(libc::ELOOP) => {
            warn!(%path, "failed to create cache directory: symbolic link loop in the path")
        }
        Some(libc::EMLINK) => {
            warn!(%path, "failed to create cache directory: parent link count exceeded")
        }
        Some(libc::ENAMETOOLONG) => {
            warn!(%path, "failed to create cache directory: path name too long")
        }
        Some(libc::EROFS) => {
            warn!(%path, "failed to create cache directory: read-only file system")
        }
        _ => warn!(%path, error = %e, "failed to create cache directory"),
    }
}

fn warn_opendir_failure(path: &Path, e: &std::io::Error) {
    let path = path.display();
    match e.raw_os_error() {
        Some(libc::ENOENT) => warn!(%path, "cache directory does not exist"),
        Some(libc::EACCES) => {
            warn!(%path, "cache directory not readable: check your permissions")
        }
        Some(libc::ENOTDIR) => warn!(%path, "cache path component is not a directory"),
        Some(libc::EMFILE) | Some(libc::ENFILE) => {
            warn!(%path, "too many open file descriptors while scanning the cache")
        }
        _ => warn!(%path, error = %e, "failed to scan cache directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cache/.DevMgr_node");
        make_directory(target.to_str().unwrap()).unwrap();
        assert!(target.is_dir());

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, CACHE_DIR_MODE);
    }

    #[test]
    fn test_existing_components_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cache/.node");
        make_directory(target.to_str().unwrap()).unwrap();
        make_directory(target.to_str().unwrap()).unwrap();
    }

    #[test]
    fn test_unwritable_entry_fails_the_check() {
        // Root can write anywhere; the access() check is meaningless then
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cache");
        fs::create_dir_all(&target).unwrap();
        let file = target.join("stale.lock");
        fs::write(&file, b"x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();

        let err = make_directory(target.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::Filesystem { .. }));
    }

    #[test]
    fn test_component_under_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        let target = file.join("cache");
        let err = make_directory(target.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::Filesystem { .. }));
    }
}
