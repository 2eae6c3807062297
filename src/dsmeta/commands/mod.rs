use crate::config::MetaConfig;
use crate::document::{Format, TextFormat};
use crate::metadata::Metadata;
use crate::permissions::Principals;
use std::path::PathBuf;

pub mod check;
pub mod config;
pub mod filter;
pub mod helpers;
pub mod merge;
pub mod show;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub metadata: Option<Metadata>,
    /// Rendered document when it was not written to a file
    pub document: Option<String>,
    pub config: Option<MetaConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_document(mut self, document: String) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_config(mut self, config: MetaConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// How a command renders the metadata it produces.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Prune to what these principals may read; `None` shows everything.
    pub requester: Option<Principals>,
    /// Tree format for every root; `None` falls back to the config, then to
    /// each root's own format.
    pub format: Option<Format>,
    /// Text encoding; a `path` extension takes precedence.
    pub text_format: Option<TextFormat>,
    /// Write here instead of returning the document.
    pub path: Option<PathBuf>,
}

impl OutputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requester(mut self, requester: Principals) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_text_format(mut self, text_format: TextFormat) -> Self {
        self.text_format = Some(text_format);
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}
