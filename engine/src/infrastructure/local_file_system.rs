//! Local file system adapter
//! Serves descriptor and code paths from a directory tree on the local host.
//! Paths crossing this port are rooted at the configured root directory
//! (`/nodes/...`, `/devices/...`).

use crate::domain::ports::FileSystem;
use crate::domain::{DomainError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct LocalFileSystem {
    root: PathBuf,
    ior: String,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let ior = format!("ior:fs:{}", root.display());
        Self { root, ior }
    }

    fn local(&self, path: &str) -> PathBuf {
        self.root.join(Path::new(path.trim_start_matches('/')))
    }
}

impl FileSystem for LocalFileSystem {
    fn ior(&self) -> String {
        self.ior.clone()
    }

    fn exists(&self, path: &str) -> Result<bool> {
        match std::fs::metadata(self.local(path)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::Filesystem {
                path: path.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        std::fs::read_to_string(self.local(path)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DomainError::NotFound(path.to_string()),
            _ => DomainError::Filesystem {
                path: path.to_string(),
                detail: e.to_string(),
            },
        })
    }

    fn absolute_path(&self, path: &str) -> Result<String> {
        let local = self.local(path);
        local
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| DomainError::Filesystem {
                path: path.to_string(),
                detail: "path is not valid UTF-8".to_string(),
            })
    }
}
