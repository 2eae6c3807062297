//! # Storage Layer
//!
//! Commands read and write metadata documents through the [`DocumentStore`]
//! trait, so the command layer never touches the filesystem directly.
//!
//! - [`fs::FileStore`]: documents are files; parent directories are created
//!   on write.
//! - [`memory::InMemoryStore`]: a path-keyed map for tests.
//!
//! Stores deal in text only. Choosing YAML or JSON from the path and parsing
//! the text happen in the command helpers.

use crate::error::Result;
use std::path::Path;

pub mod fs;
pub mod memory;

pub trait DocumentStore {
    /// Read the document text at `path`
    fn read(&self, path: &Path) -> Result<String>;

    /// Create or replace the document at `path`
    fn write(&mut self, path: &Path, contents: &str) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
}
