//! # API Facade
//!
//! [`MetaApi`] is the single entry point for dsmeta operations, whatever the
//! UI. It dispatches to `commands/*.rs`, holds the loaded configuration and
//! returns `Result<CmdResult>`. It does no printing and no formatting.
//!
//! The facade is generic over [`DocumentStore`]: `MetaApi<FileStore>` in the
//! CLI, `MetaApi<InMemoryStore>` in tests.

use crate::commands;
use crate::config::MetaConfig;
use crate::error::Result;
use crate::filter::View;
use crate::merge::MergeOptions;
use crate::store::DocumentStore;
use std::path::{Path, PathBuf};

pub struct MetaApi<S: DocumentStore> {
    store: S,
    config: MetaConfig,
    config_dir: PathBuf,
}

impl<S: DocumentStore> MetaApi<S> {
    pub fn new(store: S, config: MetaConfig, config_dir: PathBuf) -> Self {
        Self {
            store,
            config,
            config_dir,
        }
    }

    pub fn check(&self, path: &Path) -> Result<commands::CmdResult> {
        commands::check::run(&self.store, &self.config, path)
    }

    pub fn show(&mut self, path: &Path, output: &OutputOptions) -> Result<commands::CmdResult> {
        commands::show::run(&mut self.store, &self.config, path, output)
    }

    pub fn merge(
        &mut self,
        paths: &[PathBuf],
        options: &MergeOptions,
        output: &OutputOptions,
    ) -> Result<commands::CmdResult> {
        commands::merge::run(&mut self.store, &self.config, paths, options, output)
    }

    pub fn view(&mut self, path: &Path, view: View, output: &OutputOptions) -> Result<commands::CmdResult> {
        commands::filter::run(&mut self.store, &self.config, path, view, output)
    }

    /// Config changes are saved to disk and also take effect on this instance.
    pub fn config(&mut self, action: ConfigAction) -> Result<commands::CmdResult> {
        let result = commands::config::run(&self.config_dir, action)?;
        if let Some(config) = &result.config {
            self.config = config.clone();
        }
        Ok(result)
    }

    pub fn settings(&self) -> &MetaConfig {
        &self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

pub use crate::commands::config::ConfigAction;
pub use commands::{CmdMessage, CmdResult, MessageLevel, OutputOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::helpers::fixtures;
    use crate::document::TextFormat;
    use crate::store::memory::InMemoryStore;
    use tempfile::tempdir;

    #[test]
    fn test_api_dispatches_to_commands() {
        let dir = tempdir().unwrap();
        let store = InMemoryStore::new()
            .with_document("a.yaml", fixtures::dataset("lower: 0"))
            .with_document("b.yaml", fixtures::dataset("upper: 9"));
        let mut api = MetaApi::new(store, fixtures::config(), dir.path().to_path_buf());

        assert!(api.check(Path::new("a.yaml")).unwrap().metadata.is_some());

        let output = OutputOptions::new().with_path("merged.yaml");
        api.merge(
            &[PathBuf::from("a.yaml"), PathBuf::from("b.yaml")],
            &MergeOptions::default(),
            &output,
        )
        .unwrap();
        assert!(api.store().get(Path::new("merged.yaml")).is_some());

        let result = api
            .view(Path::new("merged.yaml"), View::SmartNoise, &OutputOptions::new())
            .unwrap();
        assert!(result.document.unwrap().contains("upper"));
    }

    #[test]
    fn test_config_updates_settings() {
        let dir = tempdir().unwrap();
        let mut api = MetaApi::new(InMemoryStore::new(), MetaConfig::default(), dir.path().to_path_buf());
        api.config(ConfigAction::Set("text_format".into(), "json".into()))
            .unwrap();
        assert_eq!(api.settings().text_format, TextFormat::Json);
    }
}
