//! In-crate doubles for the host side of the writer contract.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use sluice_api::config::{ConfigValues, ParamValue};
use sluice_api::error::PluginError;
use sluice_api::task::{TaskContext, TaskId, COMPRESS_OUTPUT, OUTPUT_CODEC};
use sluice_api::writer::{Committer, FileSystem, OutputStream};

/// In-memory stream whose contents stay readable after `finish`.
#[derive(Clone, Default)]
pub(crate) struct MemStream {
    buf: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<usize>>,
    finished: Arc<AtomicBool>,
}

impl MemStream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contents(&self) -> Vec<u8> {
        self.buf.lock().unwrap().clone()
    }

    /// Number of `write`/`write_all` calls seen.
    pub(crate) fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Write for MemStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        *self.writes.lock().unwrap() += 1;
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.write(data).map(|_| ())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputStream for MemStream {
    fn finish(self: Box<Self>) -> io::Result<()> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FileStream(std::fs::File);

impl Write for FileStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl OutputStream for FileStream {
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.0.flush()
    }
}

pub(crate) struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn create(&self, path: &Path, overwrite: bool) -> Result<Box<dyn OutputStream>, PluginError> {
        let mut opts = OpenOptions::new();
        opts.write(true);
        if overwrite {
            opts.create(true).truncate(true);
        } else {
            opts.create_new(true);
        }
        Ok(Box::new(FileStream(opts.open(path)?)))
    }
}

pub(crate) struct TestContext {
    config: ConfigValues,
    id: TaskId,
}

impl TestContext {
    pub(crate) fn new(config: ConfigValues) -> Self {
        Self {
            config,
            id: TaskId::new("job_test", 3, 0),
        }
    }

    pub(crate) fn compressed(codec: &str) -> Self {
        Self::new(
            ConfigValues::new()
                .with(COMPRESS_OUTPUT, ParamValue::Bool(true))
                .with(OUTPUT_CODEC, ParamValue::Str(codec.into())),
        )
    }
}

impl TaskContext for TestContext {
    fn config(&self) -> &ConfigValues {
        &self.config
    }

    fn task_id(&self) -> &TaskId {
        &self.id
    }

    fn file_system(&self, _path: &Path) -> Result<Arc<dyn FileSystem>, PluginError> {
        Ok(Arc::new(StdFileSystem))
    }
}

/// Writes straight into `dir`; names are `{name}-{partition}{ext}`.
pub(crate) struct DirCommitter {
    dir: PathBuf,
}

impl DirCommitter {
    pub(crate) fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl Committer for DirCommitter {
    fn work_path(&self) -> &Path {
        &self.dir
    }

    fn unique_file(&self, ctx: &dyn TaskContext, name: &str, extension: &str) -> String {
        format!("{name}-{}{extension}", ctx.task_id().partition)
    }
}
