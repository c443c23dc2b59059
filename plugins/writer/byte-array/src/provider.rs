use sluice_api::error::PluginError;
use sluice_api::record::RecordWrapper;
use sluice_api::task::TaskContext;
use sluice_api::writer::{Committer, RecordWriter, RecordWriterProvider};

use crate::compression::Compression;
use crate::config::ByteArrayConfig;
use crate::delimiter::Delimiter;
use crate::writer::ByteRecordWriter;

/// Provides [`ByteRecordWriter`]s that store payload bytes as-is, each followed
/// by the configured delimiter, optionally compressed.
///
/// Delimiter and compression are resolved once, when the provider is built;
/// every writer it hands out shares them read-only.
#[derive(Debug)]
pub struct ByteArrayRecordWriterProvider {
    delimiter: Delimiter,
    compression: Compression,
}

impl ByteArrayRecordWriterProvider {
    pub fn new(ctx: &dyn TaskContext) -> Result<Self, PluginError> {
        let cfg = ByteArrayConfig::from_config(ctx.config())?;
        let delimiter = Delimiter::parse(&cfg.record_delimiter);
        let compression = Compression::select(ctx.compress_output(), ctx.output_codec());

        tracing::debug!(
            task = %ctx.task_id(),
            delimiter = ?delimiter,
            codec = compression.name(),
            extension = compression.default_extension(),
            "byte-array writer configured"
        );

        Ok(Self {
            delimiter,
            compression,
        })
    }

    pub fn delimiter(&self) -> &Delimiter {
        &self.delimiter
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }
}

impl RecordWriterProvider for ByteArrayRecordWriterProvider {
    fn filename_extension(&self) -> &str {
        self.compression.default_extension()
    }

    fn data_record_writer(
        &self,
        ctx: &dyn TaskContext,
        file_name: &str,
        _sample: Option<&RecordWrapper<Vec<u8>>>,
        committer: &dyn Committer,
    ) -> Result<Box<dyn RecordWriter>, PluginError> {
        let unique = committer.unique_file(ctx, file_name, self.filename_extension());
        let path = committer.work_path().join(unique);

        let fs = ctx.file_system(&path)?;
        // Exclusive create: a second writer for the same destination fails here.
        let out = fs
            .create(&path, false)
            .map_err(|e| e.with_context(format!("create {}", path.display())))?;
        let out = self.compression.wrap(out);

        tracing::debug!(
            task = %ctx.task_id(),
            path = %path.display(),
            codec = self.compression.name(),
            "opened record writer"
        );

        Ok(Box::new(ByteRecordWriter::new(
            out,
            self.delimiter.clone(),
            path,
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use sluice_api::config::{ConfigValues, ParamValue};
    use sluice_api::error::ErrorKind;
    use sluice_api::task::COMPRESS_OUTPUT;
    use tempfile::tempdir;

    use super::*;
    use crate::config::RECORD_DELIMITER;
    use crate::test_support::{DirCommitter, TestContext};

    fn rec(payload: &[u8]) -> RecordWrapper<Vec<u8>> {
        RecordWrapper::new(payload.to_vec(), 1)
    }

    fn write_all(
        provider: &ByteArrayRecordWriterProvider,
        ctx: &TestContext,
        committer: &DirCommitter,
        name: &str,
        payloads: &[&[u8]],
    ) {
        let mut w = provider
            .data_record_writer(ctx, name, None, committer)
            .unwrap();
        for p in payloads {
            w.write(Some(&rec(p))).unwrap();
        }
        w.close().unwrap();
    }

    #[test]
    fn test_defaults_uncompressed_nul() {
        let ctx = TestContext::new(ConfigValues::new());
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();

        assert_eq!(provider.delimiter().as_bytes(), &[0x00]);
        assert_eq!(provider.compression(), Compression::None);
        assert_eq!(provider.filename_extension(), "");
    }

    #[test]
    fn test_extension_per_codec() {
        let cases = [
            ("snappy", ".snappy"),
            ("gzip", ".gz"),
            ("bzip2", ".deflate"),
        ];
        for (codec, ext) in cases {
            let provider = ByteArrayRecordWriterProvider::new(&TestContext::compressed(codec)).unwrap();
            assert_eq!(provider.filename_extension(), ext, "codec {codec}");
        }

        // Flag set without a codec name falls back to the default codec.
        let ctx = TestContext::new(ConfigValues::new().with(COMPRESS_OUTPUT, ParamValue::Bool(true)));
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();
        assert_eq!(provider.filename_extension(), ".deflate");
    }

    #[test]
    fn test_uncompressed_file_bytes() {
        let dir = tempdir().unwrap();
        let ctx = TestContext::new(ConfigValues::new());
        let committer = DirCommitter::new(dir.path());
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();

        write_all(&provider, &ctx, &committer, "events", &[b"A", b"BB", b"CCC"]);

        let bytes = std::fs::read(dir.path().join("events-3")).unwrap();
        assert_eq!(bytes, b"A\x00BB\x00CCC\x00");
    }

    #[test]
    fn test_configured_delimiter_round_trip() {
        let dir = tempdir().unwrap();
        let ctx = TestContext::new(
            ConfigValues::new().with(RECORD_DELIMITER, ParamValue::Str("|".into())),
        );
        let committer = DirCommitter::new(dir.path());
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();
        let payloads: [&[u8]; 4] = [b"{\"id\":1}", b"{\"id\":2}", b"", b"{\"id\":4}"];

        write_all(&provider, &ctx, &committer, "part", &payloads);

        let bytes = std::fs::read(dir.path().join("part-3")).unwrap();
        let mut records: Vec<&[u8]> = bytes.split(|b| *b == b'|').collect();
        // Trailing delimiter leaves one empty tail.
        assert_eq!(records.pop(), Some(&b""[..]));
        assert_eq!(records, payloads);
    }

    #[test]
    fn test_gzip_file_decompresses_to_frames() {
        let dir = tempdir().unwrap();
        let ctx = TestContext::compressed("gzip");
        let committer = DirCommitter::new(dir.path());
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();

        write_all(&provider, &ctx, &committer, "events", &[b"A", b"BB", b"CCC"]);

        let file = std::fs::File::open(dir.path().join("events-3.gz")).unwrap();
        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(file)
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, b"A\x00BB\x00CCC\x00");
    }

    #[test]
    fn test_snappy_file_decompresses_to_frames() {
        let dir = tempdir().unwrap();
        let ctx = TestContext::compressed("snappy");
        let committer = DirCommitter::new(dir.path());
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();

        write_all(&provider, &ctx, &committer, "events", &[b"one", b"two"]);

        let file = std::fs::File::open(dir.path().join("events-3.snappy")).unwrap();
        let mut decoded = Vec::new();
        snap::read::FrameDecoder::new(file)
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, b"one\x00two\x00");
    }

    #[test]
    fn test_second_writer_for_same_destination_fails() {
        let dir = tempdir().unwrap();
        let ctx = TestContext::new(ConfigValues::new());
        let committer = DirCommitter::new(dir.path());
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();

        let first = provider
            .data_record_writer(&ctx, "dup", None, &committer)
            .unwrap();
        let err = match provider.data_record_writer(&ctx, "dup", None, &committer) {
            Ok(_) => panic!("second exclusive create must fail"),
            Err(e) => e,
        };
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.message.contains("dup-3"), "{}", err.message);
        first.close().unwrap();
    }

    #[test]
    fn test_missing_work_dir_is_io_error() {
        let dir = tempdir().unwrap();
        let ctx = TestContext::new(ConfigValues::new());
        let committer = DirCommitter::new(&dir.path().join("does-not-exist"));
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();

        let err = match provider.data_record_writer(&ctx, "x", None, &committer) {
            Ok(_) => panic!("create under a missing directory must fail"),
            Err(e) => e,
        };
        assert_eq!(err.kind, ErrorKind::Io);
    }

    #[test]
    fn test_extension_stable_across_writers() {
        let dir = tempdir().unwrap();
        let ctx = TestContext::compressed("gzip");
        let committer = DirCommitter::new(dir.path());
        let provider = ByteArrayRecordWriterProvider::new(&ctx).unwrap();

        let before = provider.filename_extension().to_string();
        for name in ["a", "b", "c"] {
            write_all(&provider, &ctx, &committer, name, &[b"r"]);
            assert_eq!(provider.filename_extension(), before);
        }
        assert!(dir.path().join("c-3.gz").exists());
    }
}
