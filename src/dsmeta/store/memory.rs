use super::DocumentStore;
use crate::error::Result;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    documents: HashMap<PathBuf, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.documents.insert(path.into(), contents.into());
        self
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.documents.get(path).map(String::as_str)
    }
}

impl DocumentStore for InMemoryStore {
    fn read(&self, path: &Path) -> Result<String> {
        self.documents.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
            .into()
        })
    }

    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        self.documents.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }
}
