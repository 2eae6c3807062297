use crate::document::{Format, TextFormat};
use crate::error::{MetaError, Result};
use crate::permissions::Principals;
use crate::specification::{Role, RoleUuids, Specification};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

const CONFIG_FILENAME: &str = "dsmeta.json";
const DEFAULT_SPECIFICATION: &str = "dataset_standard_1";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Settings for dsmeta, stored in `<config dir>/dsmeta.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaConfig {
    /// Specification for `dataset` roots that do not name one. Empty disables it.
    #[serde(default = "default_specification")]
    pub default_specification: String,

    /// Principals granted the owner role
    #[serde(default)]
    pub owner_uuids: Vec<Uuid>,

    /// Principals granted the user role
    #[serde(default)]
    pub user_uuids: Vec<Uuid>,

    /// Tree format used when writing documents; unset keeps each root's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<Format>,

    /// Text encoding used when writing to stdout
    #[serde(default)]
    pub text_format: TextFormat,

    /// Fallback tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_specification() -> String {
    DEFAULT_SPECIFICATION.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            default_specification: default_specification(),
            owner_uuids: Vec::new(),
            user_uuids: Vec::new(),
            output_format: None,
            text_format: TextFormat::default(),
            log_level: default_log_level(),
        }
    }
}

impl MetaConfig {
    pub const KEYS: [&'static str; 6] = [
        "default_specification",
        "owner_uuids",
        "user_uuids",
        "output_format",
        "text_format",
        "log_level",
    ];

    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let join = |uuids: &[Uuid]| {
            uuids
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        match key {
            "default_specification" => Some(self.default_specification.clone()),
            "owner_uuids" => Some(join(&self.owner_uuids)),
            "user_uuids" => Some(join(&self.user_uuids)),
            "output_format" => Some(
                self.output_format
                    .map(|f| f.to_string())
                    .unwrap_or_default(),
            ),
            "text_format" => Some(self.text_format.to_string()),
            "log_level" => Some(self.log_level.clone()),
            _ => None,
        }
    }

    /// Sets a key from its textual form. Uuid lists are comma separated.
    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "default_specification" => {
                if !value.is_empty() {
                    value.parse::<Specification>().map_err(|e| e.to_string())?;
                }
                self.default_specification = value.to_string();
            }
            "owner_uuids" => self.owner_uuids = parse_uuids(value)?,
            "user_uuids" => self.user_uuids = parse_uuids(value)?,
            "output_format" if value.is_empty() => self.output_format = None,
            "output_format" => {
                let format: Format = value.parse().map_err(|e: MetaError| e.to_string())?;
                self.output_format = Some(format);
            }
            "text_format" => self.text_format = value.parse()?,
            "log_level" => self.log_level = value.to_string(),
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }

    /// Role assignments, or `None` when no principal is configured.
    pub fn role_uuids(&self) -> Option<RoleUuids> {
        if self.owner_uuids.is_empty() && self.user_uuids.is_empty() {
            return None;
        }
        let mut roles = RoleUuids::new();
        roles.insert(Role::Owner, self.owner_uuids.iter().copied().collect::<Principals>());
        roles.insert(Role::User, self.user_uuids.iter().copied().collect::<Principals>());
        Some(roles)
    }

    pub fn default_specification(&self) -> Result<Option<Specification>> {
        if self.default_specification.is_empty() {
            return Ok(None);
        }
        self.default_specification.parse().map(Some)
    }
}

fn parse_uuids(value: &str) -> std::result::Result<Vec<Uuid>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Uuid::parse_str(s).map_err(|e| format!("invalid uuid '{}': {}", s, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = MetaConfig::default();
        assert_eq!(config.default_specification, "dataset_standard_1");
        assert_eq!(config.output_format, None);
        assert!(config.role_uuids().is_none());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let config = MetaConfig::load(dir.path()).unwrap();
        assert_eq!(config, MetaConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested");

        let mut config = MetaConfig::default();
        config.set("output_format", "simple").unwrap();
        config
            .set("owner_uuids", "00000000-0000-0000-0000-000000000001")
            .unwrap();
        config.save(&target).unwrap();

        let mut loaded = MetaConfig::load(&target).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.output_format, Some(Format::Simple));
        assert!(loaded.set("output_format", "fancy").is_err());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: MetaConfig = serde_json::from_str(r#"{"log_level": "debug"}"#).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.default_specification, "dataset_standard_1");
    }

    #[test]
    fn test_get_and_set() {
        let mut config = MetaConfig::default();
        config.set("user_uuids", "00000000-0000-0000-0000-000000000002, 00000000-0000-0000-0000-000000000003").unwrap();
        assert_eq!(config.user_uuids.len(), 2);
        assert_eq!(
            config.get("user_uuids").unwrap(),
            "00000000-0000-0000-0000-000000000002,00000000-0000-0000-0000-000000000003"
        );

        let roles = config.role_uuids().unwrap();
        assert!(roles[&Role::Owner].is_empty());
        assert_eq!(roles[&Role::User].len(), 2);

        assert!(config.set("user_uuids", "not-a-uuid").is_err());
        assert!(config.set("default_specification", "dataset_fancy_1").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert_eq!(config.get("colour"), None);
    }

    #[test]
    fn test_empty_default_specification_disables_it() {
        let mut config = MetaConfig::default();
        assert!(config.default_specification().unwrap().is_some());
        config.set("default_specification", "").unwrap();
        assert!(config.default_specification().unwrap().is_none());
    }
}
