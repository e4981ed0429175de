use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use scripthost_core::error::CoreError;
use scripthost_core::naming::validate_plain_name;

/// Scripts stored as plain files in one directory.
#[derive(Debug, Clone)]
pub struct ScriptLibrary {
    dir: PathBuf,
}

impl ScriptLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a script's source. Unknown or malformed names are `NotFound`.
    pub async fn load(&self, filename: &str) -> Result<String, CoreError> {
        let not_found = || CoreError::NotFound {
            entity: "script",
            key: filename.to_string(),
        };
        validate_plain_name("script filename", filename).map_err(|_| not_found())?;

        match tokio::fs::read_to_string(self.dir.join(filename)).await {
            Ok(source) => Ok(source),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(err) => Err(err.into()),
        }
    }

    /// Filenames of every regular file in the directory, sorted.
    pub async fn list(&self) -> Result<Vec<String>, CoreError> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn load_and_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("b.rhai"), "done(2);").expect("write");
        std::fs::write(dir.path().join("a.rhai"), "done(1);").expect("write");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");

        let library = ScriptLibrary::new(dir.path());
        assert_eq!(library.load("a.rhai").await.expect("load"), "done(1);");
        assert_eq!(library.list().await.expect("list"), vec!["a.rhai", "b.rhai"]);
    }

    #[tokio::test]
    async fn missing_and_malformed_names_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let library = ScriptLibrary::new(dir.path());

        assert_matches!(
            library.load("absent.rhai").await,
            Err(CoreError::NotFound { entity: "script", .. })
        );
        assert_matches!(
            library.load("../etc/passwd").await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn missing_directory_lists_nothing() {
        let library = ScriptLibrary::new("/definitely/not/here");
        assert!(library.list().await.expect("list").is_empty());
    }
}
