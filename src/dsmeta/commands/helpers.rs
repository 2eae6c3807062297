use super::{CmdMessage, CmdResult, OutputOptions};
use crate::config::MetaConfig;
use crate::document::TextFormat;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::store::DocumentStore;
use std::path::Path;

/// Reads and checks the document at `path` with the configured roles and
/// default specification.
pub fn load_metadata<S: DocumentStore>(store: &S, config: &MetaConfig, path: &Path) -> Result<Metadata> {
    let text = store.read(path)?;
    Metadata::from_text(
        &text,
        TextFormat::from_path(path),
        config.role_uuids().as_ref(),
        config.default_specification()?.as_ref(),
    )
}

pub fn load_all<S: DocumentStore>(
    store: &S,
    config: &MetaConfig,
    paths: &[impl AsRef<Path>],
) -> Result<Vec<Metadata>> {
    paths
        .iter()
        .map(|path| load_metadata(store, config, path.as_ref()))
        .collect()
}

/// Renders `metadata` and either writes it to `output.path` or attaches it
/// to the result.
pub fn emit<S: DocumentStore>(
    store: &mut S,
    config: &MetaConfig,
    metadata: Metadata,
    output: &OutputOptions,
) -> Result<CmdResult> {
    let text_format = match &output.path {
        Some(path) => TextFormat::from_path(path),
        None => output.text_format.unwrap_or(config.text_format),
    };
    let format = output.format.or(config.output_format);
    let text = metadata.to_text(text_format, output.requester.as_ref(), format)?;

    let result = CmdResult::default().with_metadata(metadata);
    match &output.path {
        Some(path) => {
            store.write(path, &text)?;
            let mut result = result;
            result.add_message(CmdMessage::success(format!("Wrote {}", path.display())));
            Ok(result)
        }
        None => Ok(result.with_document(text)),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared documents for command tests.

    pub const OWNER: &str = "00000000-0000-0000-0000-000000000001";
    pub const USER: &str = "00000000-0000-0000-0000-000000000002";

    pub fn config() -> crate::config::MetaConfig {
        let mut config = crate::config::MetaConfig::default();
        config.set("owner_uuids", OWNER).unwrap();
        config.set("user_uuids", USER).unwrap();
        config
    }

    /// A csv-backed dataset with one int column; `bounds` is spliced into
    /// the column's `private_sql_and_synthesis` group.
    pub fn dataset(bounds: &str) -> String {
        format!(
            r#"dataset:
  format: simple
  node:
    type_name: dataset
    attributes:
      data: {{name: census}}
    child_nodes:
      - type_name: database
        attributes:
          data: {{name: main}}
        child_nodes:
          - type_name: schema
            child_nodes:
              - type_name: table
                attributes:
                  connector: {{type_name: csv, uri: census.csv}}
                  data: {{name: people, rows: 100}}
                child_nodes:
                  - type_name: column
                    attributes:
                      data: {{name: age, data_type_name: int}}
                      machine_learning: {{is_feature: true}}
                      private_sql_and_synthesis: {{{}}}
"#,
            bounds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;
    use crate::document::Format;
    use crate::metadata::RootName;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn test_load_uses_default_specification() {
        let store = InMemoryStore::new().with_document("a.yaml", fixtures::dataset("lower: 0"));
        let metadata = load_metadata(&store, &fixtures::config(), Path::new("a.yaml")).unwrap();
        assert_eq!(
            metadata
                .specification(RootName::Dataset)
                .map(|s| s.to_string()),
            Some("dataset_standard_1".to_string())
        );
    }

    #[test]
    fn test_emit_returns_document() {
        let store = InMemoryStore::new().with_document("a.yaml", fixtures::dataset("lower: 0"));
        let config = fixtures::config();
        let metadata = load_metadata(&store, &config, Path::new("a.yaml")).unwrap();

        let mut store = store;
        let output = OutputOptions::new()
            .with_format(Format::Simple)
            .with_text_format(TextFormat::Json);
        let result = emit(&mut store, &config, metadata, &output).unwrap();
        let document: serde_json::Value =
            serde_json::from_str(result.document.as_deref().unwrap()).unwrap();
        assert_eq!(document["dataset"]["format"], "simple");
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_emit_writes_to_path() {
        let mut store = InMemoryStore::new().with_document("a.yaml", fixtures::dataset("lower: 0"));
        let config = fixtures::config();
        let metadata = load_metadata(&store, &config, Path::new("a.yaml")).unwrap();

        let output = OutputOptions::new().with_path("out/b.json");
        let result = emit(&mut store, &config, metadata, &output).unwrap();
        assert!(result.document.is_none());
        assert_eq!(result.messages.len(), 1);

        let written = store.get(Path::new("out/b.json")).unwrap();
        let document: serde_json::Value = serde_json::from_str(written).unwrap();
        assert_eq!(document["dataset"]["format"], "simple");
    }
}
