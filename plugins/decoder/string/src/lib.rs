use sluice_api::config::ConfigValues;
use sluice_api::decoder::MessageDecoder;
use sluice_api::ffi::{plugin_ok, PluginCreateResult};
use sluice_api::record::RecordWrapper;
use sluice_api::util::now_ms;

/// Decodes payloads as text and stamps them with the wall-clock receipt time.
///
/// Bytes that are not valid UTF-8 become U+FFFD; decoding never fails.
#[derive(Debug, Default)]
pub struct StringMessageDecoder {
    props: ConfigValues,
    topic: String,
}

impl StringMessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn properties(&self) -> &ConfigValues {
        &self.props
    }
}

impl MessageDecoder for StringMessageDecoder {
    type Output = String;

    fn init(&mut self, props: &ConfigValues, topic: &str) {
        self.props = props.clone();
        self.topic = topic.to_string();
        tracing::debug!(topic, props = self.props.len(), "string decoder initialised");
    }

    fn decode(&self, payload: &[u8]) -> RecordWrapper<String> {
        let text = String::from_utf8_lossy(payload).into_owned();
        RecordWrapper::new(text, now_ms())
    }
}

// ---- FFI ----

/// # Safety
/// `_ctx_ptr` is unused and may be null; configuration arrives through `init`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sluice_create_message_decoder(_ctx_ptr: *const ()) -> PluginCreateResult {
    plugin_ok(Box::new(
        Box::new(StringMessageDecoder::new()) as Box<dyn MessageDecoder<Output = String>>
    ))
}

sluice_api::destroy_fn!(sluice_destroy_message_decoder, dyn MessageDecoder<Output = String>);
sluice_api::config_params_fn!(sluice_decoder_config_params, []);
sluice_api::abi_version_fn!(sluice_decoder_abi_version);
