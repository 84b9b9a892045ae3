//! FileSystem port
//! Descriptors and code artifacts are fetched through an abstract file
//! system; children inherit its reference at launch. Paths handed to this
//! port are rooted at the file system's own root (`/nodes/...`,
//! `/devices/...`).

use crate::domain::Result;

pub trait FileSystem: Send + Sync {
    /// Stringified reference passed down to launched children.
    fn ior(&self) -> String;

    fn exists(&self, path: &str) -> Result<bool>;

    fn read_to_string(&self, path: &str) -> Result<String>;

    /// Resolve a file-system path to an absolute path on the local host,
    /// used to locate a launchable executable.
    fn absolute_path(&self, path: &str) -> Result<String>;
}
