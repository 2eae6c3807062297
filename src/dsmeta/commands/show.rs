use crate::commands::helpers::{emit, load_metadata};
use crate::commands::{CmdResult, OutputOptions};
use crate::config::MetaConfig;
use crate::error::Result;
use crate::store::DocumentStore;
use std::path::Path;

/// Loads a document and renders it as seen by the requester, which also
/// converts between formats.
pub fn run<S: DocumentStore>(
    store: &mut S,
    config: &MetaConfig,
    path: &Path,
    output: &OutputOptions,
) -> Result<CmdResult> {
    let metadata = load_metadata(store, config, path)?;
    emit(store, config, metadata, output)
}
