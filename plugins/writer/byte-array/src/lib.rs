//! Record writer plugin that stores raw payload bytes, one delimiter after
//! each record, optionally compressed with gzip, snappy or deflate.

mod compression;
mod config;
mod delimiter;
mod provider;
#[cfg(test)]
mod test_support;
mod writer;

use sluice_api::ffi::{context_from_ptr, plugin_err, plugin_ok, PluginCreateResult};
use sluice_api::writer::RecordWriterProvider;

pub use compression::Compression;
pub use config::{ByteArrayConfig, RECORD_DELIMITER};
pub use delimiter::{Delimiter, DEFAULT_RECORD_DELIMITER};
pub use provider::ByteArrayRecordWriterProvider;
pub use writer::ByteRecordWriter;

// ════════════════════════════════════════════════════════════════
//  Plugin FFI entry points
// ════════════════════════════════════════════════════════════════

/// # Safety
/// `ctx_ptr` must point to a `&dyn TaskContext` that outlives the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sluice_create_record_writer_provider(
    ctx_ptr: *const (),
) -> PluginCreateResult {
    if ctx_ptr.is_null() {
        return plugin_err("byte-array writer: task context is required");
    }
    let ctx = unsafe { context_from_ptr(ctx_ptr) };

    match ByteArrayRecordWriterProvider::new(ctx) {
        Ok(provider) => plugin_ok(Box::new(
            Box::new(provider) as Box<dyn RecordWriterProvider>
        )),
        Err(e) => plugin_err(&e.to_string()),
    }
}

sluice_api::destroy_fn!(sluice_destroy_record_writer_provider, dyn RecordWriterProvider);
sluice_api::config_params_fn!(sluice_writer_config_params, ByteArrayConfig);
sluice_api::abi_version_fn!(sluice_writer_abi_version);
