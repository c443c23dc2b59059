use crate::config::ConfigValues;
use crate::record::RecordWrapper;

/// Message decoder plugin — turns a raw payload taken off the source topic
/// into a timestamped record.
pub trait MessageDecoder: Send + Sync {
    type Output;

    /// Store static configuration. Called once, before the first `decode`.
    fn init(&mut self, props: &ConfigValues, topic: &str);

    fn decode(&self, payload: &[u8]) -> RecordWrapper<Self::Output>;
}
