//! File-backed key-value store shared by all scripts.
//!
//! One file per key under a fixed root. Values are UTF-8 strings with no
//! expiry or versioning; concurrent writes to a key are last-write-wins.
//! All operations are synchronous because they are called from inside a
//! running script.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::naming::validate_plain_name;

/// A directory of `key -> value` files.
#[derive(Debug, Clone)]
pub struct KvStore {
    root: PathBuf,
}

impl KvStore {
    /// Open a store rooted at `root`. The directory is created lazily on the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
        validate_plain_name("store key", key)?;
        Ok(self.root.join(key))
    }

    /// Read the value stored under `key`, or an empty string if none.
    pub fn get(&self, key: &str) -> Result<String, CoreError> {
        let path = self.path_for(key)?;
        tracing::debug!(key, "Store read");
        match fs::read_to_string(&path) {
            Ok(value) => Ok(value),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn put(&self, value: &str, key: &str) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        fs::write(&path, value)?;
        tracing::debug!(key, bytes = value.len(), "Store write");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
