use std::path::PathBuf;

use sluice_api::error::PluginError;
use sluice_api::record::RecordWrapper;
use sluice_api::writer::{OutputStream, RecordWriter};

use crate::delimiter::Delimiter;

/// Writes each record as `<payload><delimiter>` to one destination stream.
///
/// Payloads are not escaped: a payload that contains the delimiter bytes
/// cannot be told apart from two records when the file is read back.
pub struct ByteRecordWriter {
    out: Box<dyn OutputStream>,
    delimiter: Delimiter,
    /// Scratch buffer reused across calls; cleared before every record.
    frame: Vec<u8>,
    /// Destination, for logging only.
    path: PathBuf,
    records: u64,
    bytes: u64,
}

impl ByteRecordWriter {
    pub fn new(out: Box<dyn OutputStream>, delimiter: Delimiter, path: PathBuf) -> Self {
        Self {
            out,
            delimiter,
            frame: Vec::new(),
            path,
            records: 0,
            bytes: 0,
        }
    }
}

impl RecordWriter for ByteRecordWriter {
    fn write(&mut self, record: Option<&RecordWrapper<Vec<u8>>>) -> Result<(), PluginError> {
        let Some(record) = record else {
            return Ok(());
        };

        self.frame.clear();
        self.frame.extend_from_slice(record.record());
        self.frame.extend_from_slice(self.delimiter.as_bytes());
        // One write per record: the frame reaches the stream whole or not at all.
        self.out
            .write_all(&self.frame)
            .map_err(|e| PluginError::from(e).with_context(format!("write {}", self.path.display())))?;

        self.records += 1;
        self.bytes += self.frame.len() as u64;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), PluginError> {
        let Self {
            out,
            path,
            records,
            bytes,
            ..
        } = *self;
        out.finish()
            .map_err(|e| PluginError::from(e).with_context(format!("close {}", path.display())))?;
        tracing::debug!(path = %path.display(), records, bytes, "record writer closed");
        Ok(())
    }
}
