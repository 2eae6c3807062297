use crate::commands::helpers::{emit, load_metadata};
use crate::commands::{CmdResult, OutputOptions};
use crate::config::MetaConfig;
use crate::error::Result;
use crate::filter::View;
use crate::store::DocumentStore;
use std::path::Path;

/// Projects the `dataset` root of a document through a named view.
pub fn run<S: DocumentStore>(
    store: &mut S,
    config: &MetaConfig,
    path: &Path,
    view: View,
    output: &OutputOptions,
) -> Result<CmdResult> {
    let metadata = load_metadata(store, config, path)?.view(view)?;
    emit(store, config, metadata, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::helpers::fixtures;
    use crate::store::memory::InMemoryStore;

    fn store() -> InMemoryStore {
        InMemoryStore::new().with_document("a.yaml", fixtures::dataset("lower: 0, upper: 99"))
    }

    #[test]
    fn test_ml_view_hides_bounds() {
        let mut store = store();
        let result = run(
            &mut store,
            &fixtures::config(),
            Path::new("a.yaml"),
            View::MachineLearning,
            &OutputOptions::new(),
        )
        .unwrap();
        let document = result.document.unwrap();
        assert!(document.contains("is_feature"));
        assert!(!document.contains("upper"));
        assert!(!document.contains("rows"));
    }

    #[test]
    fn test_sql_view_keeps_bounds() {
        let mut store = store();
        let result = run(
            &mut store,
            &fixtures::config(),
            Path::new("a.yaml"),
            View::SmartNoise,
            &OutputOptions::new(),
        )
        .unwrap();
        let document = result.document.unwrap();
        assert!(document.contains("upper"));
        assert!(document.contains("rows"));
        assert!(!document.contains("is_feature"));
    }

    #[test]
    fn test_regular_view_keeps_connector_location() {
        let mut store = store();
        let result = run(
            &mut store,
            &fixtures::config(),
            Path::new("a.yaml"),
            View::Regular,
            &OutputOptions::new(),
        )
        .unwrap();
        let document = result.document.unwrap();
        assert!(document.contains("census.csv"));
        assert!(document.contains("upper"));
        assert!(document.contains("is_feature"));
    }
}
