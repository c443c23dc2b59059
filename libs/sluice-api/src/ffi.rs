use crate::config::ConfigParam;
use crate::task::TaskContext;

/// Current ABI version. Host checks this against the plugin's exported version.
pub const SLUICE_ABI_VERSION: u32 = 1;

/// FFI return struct from `sluice_create_*` functions.
#[repr(C)]
pub struct PluginCreateResult {
    /// Pointer to the created plugin object (Box<Box<dyn Trait>>).
    /// Null if creation failed.
    pub plugin_ptr: *mut (),
    /// Pointer to a heap-allocated error string.
    /// Null if creation succeeded.
    pub error_ptr: *mut u8,
    /// Length of the error string.
    pub error_len: usize,
}

/// Type signature for `sluice_*_abi_version` symbols.
pub type AbiVersionFn = unsafe extern "C" fn() -> u32;

/// Type signature for `sluice_*_config_params` symbols.
/// Returns a pointer to a boxed `Vec<ConfigParam>`. Caller takes ownership.
pub type ConfigParamsFn = unsafe extern "C" fn() -> *mut ();

/// Type signature for `sluice_create_*` symbols.
///
/// Record writer providers receive a `*const &dyn TaskContext` (see [`context_from_ptr`]);
/// decoders receive null and are configured through `init`.
pub type CreatePluginFn = unsafe extern "C" fn(*const ()) -> PluginCreateResult;

/// Type signature for `sluice_destroy_*` symbols.
pub type DestroyPluginFn = unsafe extern "C" fn(*mut ());

/// Helper: create a successful `PluginCreateResult` from a trait object.
pub fn plugin_ok<T: ?Sized>(plugin: Box<Box<T>>) -> PluginCreateResult {
    PluginCreateResult {
        plugin_ptr: Box::into_raw(plugin) as *mut (),
        error_ptr: std::ptr::null_mut(),
        error_len: 0,
    }
}

/// Helper: create a failed `PluginCreateResult` from an error message.
pub fn plugin_err(msg: &str) -> PluginCreateResult {
    let bytes = msg.as_bytes().to_vec();
    let len = bytes.len();
    let ptr = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    PluginCreateResult {
        plugin_ptr: std::ptr::null_mut(),
        error_ptr: ptr,
        error_len: len,
    }
}

/// Helper: return config params from plugin to host.
/// Host will reconstruct as `Box<Vec<ConfigParam>>` and take ownership.
pub fn config_params_ok(params: Vec<ConfigParam>) -> *mut () {
    Box::into_raw(Box::new(params)) as *mut ()
}

/// Cast an FFI context pointer back to the host's task context.
///
/// # Safety
///
/// `ptr` must point to a live `&dyn TaskContext` owned by the host for the
/// duration of the call.
pub unsafe fn context_from_ptr<'a>(ptr: *const ()) -> &'a dyn TaskContext {
    unsafe { *(ptr as *const &'a dyn TaskContext) }
}

/// Macro: export the ABI version function under the given symbol.
///
/// Each plugin kind has its own symbol names, so several plugins can be
/// linked into one binary as rlibs without clashing.
#[macro_export]
macro_rules! abi_version_fn {
    ($name:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $name() -> u32 {
            $crate::ffi::SLUICE_ABI_VERSION
        }
    };
}

/// Macro: export the config params function under the given symbol.
///
/// Two forms:
/// - `config_params_fn!(name, MyConfigType)` — uses `MyConfigType::config_params()` from derive.
/// - `config_params_fn!(name, [])` — manual list (e.g. empty for plugins with no config).
#[macro_export]
macro_rules! config_params_fn {
    ($name:ident, [$($param:expr),* $(,)?]) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $name() -> *mut () {
            $crate::ffi::config_params_ok(vec![$($param),*])
        }
    };
    ($name:ident, $config_type:ty) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $name() -> *mut () {
            $crate::ffi::config_params_ok(<$config_type>::config_params())
        }
    };
}

/// Macro: export `sluice_destroy_*` function for a boxed trait object type,
/// e.g. `destroy_fn!(sluice_destroy_message_decoder, dyn MessageDecoder<Output = String>)`.
#[macro_export]
macro_rules! destroy_fn {
    ($name:ident, $object_ty:ty) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(ptr: *mut ()) {
            if !ptr.is_null() {
                let _ = unsafe { Box::from_raw(ptr as *mut Box<$object_ty>) };
            }
        }
    };
}
