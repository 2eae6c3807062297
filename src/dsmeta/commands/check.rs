use crate::commands::helpers::load_metadata;
use crate::commands::{CmdMessage, CmdResult};
use crate::config::MetaConfig;
use crate::error::Result;
use crate::store::DocumentStore;
use std::path::Path;

/// Loads a document, which defaults and verifies every root that has a
/// specification, and reports per root.
pub fn run<S: DocumentStore>(store: &S, config: &MetaConfig, path: &Path) -> Result<CmdResult> {
    let metadata = load_metadata(store, config, path)?;

    let mut result = CmdResult::default();
    if metadata.is_empty() {
        result.add_message(CmdMessage::warning(format!(
            "{} contains no roots",
            path.display()
        )));
    }
    for (name, root) in metadata.roots() {
        let message = match &root.specification {
            Some(specification) => CmdMessage::success(format!(
                "{}: {} is valid against {}",
                name,
                root.node.label(),
                specification
            )),
            None => CmdMessage::warning(format!("{}: no specification, not verified", name)),
        };
        result.add_message(message);
    }
    Ok(result.with_metadata(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::helpers::fixtures;
    use crate::commands::MessageLevel;
    use crate::error::MetaError;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn test_check_reports_each_root() {
        let text = format!(
            "{}other:\n  node: {{type_name: column}}\n",
            fixtures::dataset("lower: 0")
        );
        let store = InMemoryStore::new().with_document("a.yaml", text);

        let result = run(&store, &fixtures::config(), Path::new("a.yaml")).unwrap();
        let levels: Vec<_> = result.messages.iter().map(|m| m.level).collect();
        assert_eq!(levels, vec![MessageLevel::Success, MessageLevel::Warning]);
        assert!(result.messages[0].content.contains("dataset_standard_1"));
    }

    #[test]
    fn test_check_fails_on_invalid_document() {
        let store = InMemoryStore::new().with_document("a.yaml", fixtures::dataset("lower: low"));
        let err = run(&store, &fixtures::config(), Path::new("a.yaml")).unwrap_err();
        assert!(matches!(err, MetaError::Specification { .. }));
    }

    #[test]
    fn test_check_empty_document_warns() {
        let store = InMemoryStore::new().with_document("a.json", "{}");
        let result = run(&store, &fixtures::config(), Path::new("a.json")).unwrap();
        assert_eq!(result.messages[0].level, MessageLevel::Warning);
    }
}
