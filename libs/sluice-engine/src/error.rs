use std::path::PathBuf;

use sluice_api::error::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("task {task}: {message}")]
    Task { task: String, message: String },

    #[error("commit conflict: '{}' already exists", .0.display())]
    CommitConflict(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Plugin` variant, context is added to the inner `PluginError`.
    /// For other message-carrying variants, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Plugin(e) => EngineError::Plugin(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::Task { task, message } => EngineError::Task {
                task,
                message: format!("{ctx}: {message}"),
            },
            other => other,
        }
    }
}
