use super::DocumentStore;
use crate::error::Result;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for FileStore {
    fn read(&self, path: &Path) -> Result<String> {
        debug!(path = %path.display(), "reading document");
        Ok(fs::read_to_string(path)?)
    }

    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        debug!(path = %path.display(), bytes = contents.len(), "writing document");
        fs::write(path, contents)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetaError;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("meta.yaml");
        let mut store = FileStore::new();

        store.write(&path, "dataset: {}\n").unwrap();
        assert!(store.exists(&path));
        assert_eq!(store.read(&path).unwrap(), "dataset: {}\n");
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = FileStore::new().read(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, MetaError::Io(_)));
    }
}
