use crate::commands::{CmdMessage, CmdResult};
use crate::config::MetaConfig;
use crate::error::Result;
use std::path::Path;

#[derive(Debug, Clone)]
pub enum ConfigAction {
    ShowAll,
    ShowKey(String),
    Set(String, String),
}

pub fn run(config_dir: &Path, action: ConfigAction) -> Result<CmdResult> {
    match action {
        ConfigAction::ShowAll => {
            let config = MetaConfig::load(config_dir)?;
            Ok(CmdResult::default().with_config(config))
        }
        ConfigAction::ShowKey(key) => {
            let config = MetaConfig::load(config_dir)?;
            let mut result = CmdResult::default();
            match config.get(&key) {
                Some(val) => result.add_message(CmdMessage::info(val)),
                None => result.add_message(CmdMessage::error(format!("Unknown config key: {}", key))),
            }
            Ok(result)
        }
        ConfigAction::Set(key, value) => {
            let mut config = MetaConfig::load(config_dir)?;
            if let Err(e) = config.set(&key, &value) {
                let mut res = CmdResult::default();
                res.add_message(CmdMessage::error(e));
                return Ok(res);
            }
            config.save(config_dir)?;
            let display_val = config.get(&key).unwrap_or(value);
            let mut result = CmdResult::default().with_config(config);
            result.add_message(CmdMessage::success(format!("{} set to {}", key, display_val)));
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use tempfile::tempdir;

    #[test]
    fn test_set_then_show_key() {
        let dir = tempdir().unwrap();
        let result = run(
            dir.path(),
            ConfigAction::Set("text_format".into(), "json".into()),
        )
        .unwrap();
        assert_eq!(result.messages[0].level, MessageLevel::Success);

        let result = run(dir.path(), ConfigAction::ShowKey("text_format".into())).unwrap();
        assert_eq!(result.messages[0].content, "json");
    }

    #[test]
    fn test_invalid_value_is_reported_not_saved() {
        let dir = tempdir().unwrap();
        let result = run(
            dir.path(),
            ConfigAction::Set("owner_uuids".into(), "nope".into()),
        )
        .unwrap();
        assert_eq!(result.messages[0].level, MessageLevel::Error);
        assert_eq!(MetaConfig::load(dir.path()).unwrap(), MetaConfig::default());
    }

    #[test]
    fn test_show_all_returns_config() {
        let dir = tempdir().unwrap();
        let result = run(dir.path(), ConfigAction::ShowAll).unwrap();
        assert_eq!(result.config, Some(MetaConfig::default()));
    }

    #[test]
    fn test_unknown_key() {
        let dir = tempdir().unwrap();
        let result = run(dir.path(), ConfigAction::ShowKey("colour".into())).unwrap();
        assert_eq!(result.messages[0].level, MessageLevel::Error);
    }
}
