use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::ConfigValues;
use crate::error::PluginError;
use crate::writer::FileSystem;

/// Framework-level flag: compress task output.
pub const COMPRESS_OUTPUT: &str = "mapreduce.output.fileoutputformat.compress";
/// Name of the output codec, read only when [`COMPRESS_OUTPUT`] is set.
pub const OUTPUT_CODEC: &str = "etl.output.codec";

/// Identity of one task attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub job: String,
    /// Input partition handled by the task; drives unique file names.
    pub partition: u32,
    pub attempt: u32,
}

impl TaskId {
    pub fn new(job: impl Into<String>, partition: u32, attempt: u32) -> Self {
        Self {
            job: job.into(),
            partition,
            attempt,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempt_{}_m_{:06}_{}",
            self.job, self.partition, self.attempt
        )
    }
}

/// What a plugin sees of the task it runs in.
///
/// Implemented by the host; plugins only read from it.
pub trait TaskContext: Send + Sync {
    /// Task configuration: framework properties plus validated plugin params.
    fn config(&self) -> &ConfigValues;

    fn task_id(&self) -> &TaskId;

    /// Filesystem responsible for `path`.
    fn file_system(&self, path: &Path) -> Result<Arc<dyn FileSystem>, PluginError>;

    fn compress_output(&self) -> bool {
        self.config().get_bool(COMPRESS_OUTPUT).unwrap_or(false)
    }

    fn output_codec(&self) -> Option<&str> {
        self.config().get_str(OUTPUT_CODEC)
    }
}
