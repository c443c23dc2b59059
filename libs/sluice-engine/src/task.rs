use std::path::Path;
use std::sync::Arc;

use sluice_api::config::ConfigValues;
use sluice_api::error::PluginError;
use sluice_api::task::{TaskContext, TaskId};
use sluice_api::writer::FileSystem;

use crate::fs::{scheme, LocalFileSystem};

/// Host-side context of one task attempt.
pub struct TaskAttempt {
    id: TaskId,
    config: ConfigValues,
    local: Arc<LocalFileSystem>,
}

impl TaskAttempt {
    pub fn new(id: TaskId, config: ConfigValues) -> Self {
        Self {
            id,
            config,
            local: Arc::new(LocalFileSystem::new()),
        }
    }
}

impl TaskContext for TaskAttempt {
    fn config(&self) -> &ConfigValues {
        &self.config
    }

    fn task_id(&self) -> &TaskId {
        &self.id
    }

    fn file_system(&self, path: &Path) -> Result<Arc<dyn FileSystem>, PluginError> {
        if LocalFileSystem::handles(path) {
            let fs: Arc<dyn FileSystem> = self.local.clone();
            return Ok(fs);
        }
        Err(PluginError::config(format!(
            "no filesystem for scheme '{}' ({})",
            scheme(path).unwrap_or_default(),
            path.display()
        )))
    }
}
