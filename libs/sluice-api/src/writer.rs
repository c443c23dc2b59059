use std::io::{self, Write};
use std::path::Path;

use crate::error::PluginError;
use crate::record::RecordWrapper;
use crate::task::TaskContext;

/// Append-only byte sink bound to one destination path.
///
/// Either a raw file stream or an encoder wrapping one. `finish` consumes
/// the stream: it flushes, writes any codec trailer and releases the file.
pub trait OutputStream: Write + Send {
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Filesystem abstraction used to open output streams.
pub trait FileSystem: Send + Sync {
    /// Open a new stream at `path`.
    ///
    /// With `overwrite = false` the call fails if `path` already exists.
    fn create(&self, path: &Path, overwrite: bool) -> Result<Box<dyn OutputStream>, PluginError>;
}

/// Stages output files of one task until they are committed.
pub trait Committer: Send + Sync {
    /// Directory the task writes its files into.
    fn work_path(&self) -> &Path;

    /// File name unique to the task, built from `name` and `extension`.
    fn unique_file(&self, ctx: &dyn TaskContext, name: &str, extension: &str) -> String;
}

/// Appends records to exactly one destination stream.
///
/// Callers serialize access; records land in `write` call order.
pub trait RecordWriter: Send {
    /// Append one record. `None` is accepted and writes nothing.
    fn write(&mut self, record: Option<&RecordWrapper<Vec<u8>>>) -> Result<(), PluginError>;

    /// Finish the underlying stream. Called exactly once, after the last `write`.
    fn close(self: Box<Self>) -> Result<(), PluginError>;
}

/// Record writer plugin — a per-task factory of [`RecordWriter`]s.
///
/// Created once per task from its [`TaskContext`]; asked for one writer per
/// output destination.
pub trait RecordWriterProvider: Send + Sync {
    /// Extension appended to every file name this provider produces (`""` if none).
    fn filename_extension(&self) -> &str;

    /// Open the destination for `file_name` and return a writer bound to it.
    ///
    /// `sample` is the first record headed for the destination, when the caller has one.
    fn data_record_writer(
        &self,
        ctx: &dyn TaskContext,
        file_name: &str,
        sample: Option<&RecordWrapper<Vec<u8>>>,
        committer: &dyn Committer,
    ) -> Result<Box<dyn RecordWriter>, PluginError>;
}
