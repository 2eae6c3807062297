use crate::permissions::Action;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    /// Malformed document or tree: missing fields, unknown tags, duplicate or mixed keys.
    #[error("Structural error at {path}: {message}")]
    Structural { path: String, message: String },

    #[error("Merge error: {0}")]
    Merge(String),

    #[error("Specification error at {path}: {message}")]
    Specification { path: String, message: String },

    #[error("Permission denied: {action} on {target}")]
    Permission { action: Action, target: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Api Error: {0}")]
    Api(String),
}

impl MetaError {
    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        MetaError::Structural {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn specification(path: impl Into<String>, message: impl Into<String>) -> Self {
        MetaError::Specification {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn permission(action: Action, target: impl Into<String>) -> Self {
        MetaError::Permission {
            action,
            target: target.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetaError>;
