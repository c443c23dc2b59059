/// A payload paired with the time it was received.
///
/// `T` is `Vec<u8>` on the writer path and `String` after decoding.
/// Immutable once built: the pipeline reads it through accessors and
/// either borrows the payload or takes it with [`RecordWrapper::into_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrapper<T> {
    record: T,
    /// Receipt time, milliseconds since the Unix epoch.
    timestamp_ms: i64,
}

impl<T> RecordWrapper<T> {
    pub fn new(record: T, timestamp_ms: i64) -> Self {
        Self {
            record,
            timestamp_ms,
        }
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn into_record(self) -> T {
        self.record
    }

    /// Transform the payload, keeping the timestamp.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RecordWrapper<U> {
        RecordWrapper {
            record: f(self.record),
            timestamp_ms: self.timestamp_ms,
        }
    }
}

impl RecordWrapper<String> {
    /// Text payload re-encoded as UTF-8 bytes for the byte writer path.
    pub fn into_bytes(self) -> RecordWrapper<Vec<u8>> {
        self.map(String::into_bytes)
    }
}
