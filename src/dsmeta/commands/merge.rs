use crate::commands::helpers::{emit, load_all};
use crate::commands::{CmdMessage, CmdResult, OutputOptions};
use crate::config::MetaConfig;
use crate::error::{MetaError, Result};
use crate::merge::MergeOptions;
use crate::store::DocumentStore;
use std::path::PathBuf;
use tracing::info;

/// Merges two or more documents left to right; later documents only win on
/// conflicts when `options.overwrite` is set.
pub fn run<S: DocumentStore>(
    store: &mut S,
    config: &MetaConfig,
    paths: &[PathBuf],
    options: &MergeOptions,
    output: &OutputOptions,
) -> Result<CmdResult> {
    if paths.len() < 2 {
        return Err(MetaError::Api(
            "merge needs at least two documents".to_string(),
        ));
    }
    let mut documents = load_all(store, config, paths)?.into_iter();
    let mut merged = match documents.next() {
        Some(first) => first,
        None => return Err(MetaError::Api("no documents to merge".to_string())),
    };
    for (next, path) in documents.zip(&paths[1..]) {
        info!(path = %path.display(), overwrite = options.overwrite, "merging document");
        merged = merged.merge_with(&next, options, None)?;
    }

    let mut result = emit(store, config, merged, output)?;
    result.add_message(CmdMessage::info(format!("Merged {} documents", paths.len())));
    Ok(result)
}
