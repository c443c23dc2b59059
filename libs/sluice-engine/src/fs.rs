use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use sluice_api::error::PluginError;
use sluice_api::writer::{FileSystem, OutputStream};

/// Local disk filesystem.
///
/// Parent directories are created on demand; streams are buffered and
/// synced to disk on `finish`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Whether `path` belongs to the local filesystem: no scheme or `file://`.
    pub fn handles(path: &Path) -> bool {
        match scheme(path) {
            None => true,
            Some(s) => s.eq_ignore_ascii_case("file"),
        }
    }
}

/// URI scheme of `path`, if it carries one (`hdfs://nn/x` → `hdfs`).
pub fn scheme(path: &Path) -> Option<&str> {
    let s = path.to_str()?;
    let (scheme, _) = s.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Plain OS path of a local path: `file:///tmp/x` and `file://localhost/tmp/x`
/// become `/tmp/x`. Other paths are returned unchanged.
pub fn local_path(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    match scheme(path) {
        Some(sc) if sc.eq_ignore_ascii_case("file") => {
            let rest = &s[sc.len() + "://".len()..];
            let rest = rest.strip_prefix("localhost").unwrap_or(rest);
            PathBuf::from(rest)
        }
        _ => path.to_path_buf(),
    }
}

impl FileSystem for LocalFileSystem {
    fn create(&self, path: &Path, overwrite: bool) -> Result<Box<dyn OutputStream>, PluginError> {
        let path = &local_path(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PluginError::io(format!("mkdir {}: {e}", parent.display())))?;
        }

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let file = options
            .open(path)
            .map_err(|e| PluginError::io(format!("create {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), overwrite, "output stream opened");
        Ok(Box::new(FileStream {
            file: BufWriter::new(file),
        }))
    }
}

struct FileStream {
    file: BufWriter<File>,
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl OutputStream for FileStream {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let file = self.file.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_writes_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/part-0");

        let mut out = LocalFileSystem::new().create(&path, false).unwrap();
        out.write_all(b"abc").unwrap();
        out.finish().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_create_without_overwrite_fails_on_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part-0");
        std::fs::write(&path, b"old").unwrap();

        let err = LocalFileSystem::new().create(&path, false).err().unwrap();
        assert_eq!(err.kind, sluice_api::error::ErrorKind::Io);
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
    }

    #[test]
    fn test_create_with_overwrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part-0");
        std::fs::write(&path, b"old contents").unwrap();

        let mut out = LocalFileSystem::new().create(&path, true).unwrap();
        out.write_all(b"new").unwrap();
        out.finish().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_create_file_uri_writes_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/part-0");
        let uri = format!("file://{}", path.display());

        let mut out = LocalFileSystem::new().create(Path::new(&uri), false).unwrap();
        out.write_all(b"abc").unwrap();
        out.finish().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        assert!(!Path::new("file:").exists());
    }

    #[test]
    fn test_local_path_strips_file_scheme() {
        assert_eq!(local_path(Path::new("file:///tmp/x")), Path::new("/tmp/x"));
        assert_eq!(local_path(Path::new("FILE:///tmp/x")), Path::new("/tmp/x"));
        assert_eq!(local_path(Path::new("file://localhost/tmp/x")), Path::new("/tmp/x"));
        assert_eq!(local_path(Path::new("/tmp/x")), Path::new("/tmp/x"));
        assert_eq!(local_path(Path::new("hdfs://nn/x")), Path::new("hdfs://nn/x"));
    }

    #[test]
    fn test_scheme_detection() {
        assert_eq!(scheme(Path::new("hdfs://nn:8020/data")), Some("hdfs"));
        assert_eq!(scheme(Path::new("file:///tmp/x")), Some("file"));
        assert_eq!(scheme(Path::new("/tmp/x")), None);
        assert_eq!(scheme(Path::new("relative/dir")), None);

        assert!(LocalFileSystem::handles(Path::new("/tmp/x")));
        assert!(LocalFileSystem::handles(Path::new("file:///tmp/x")));
        assert!(!LocalFileSystem::handles(Path::new("s3://bucket/x")));
    }
}
