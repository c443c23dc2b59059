use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use libloading::{Library, Symbol};

use sluice_api::config::{ConfigParam, ConfigValues, ParamType, ParamValue};
use sluice_api::decoder::MessageDecoder;
use sluice_api::error::PluginError;
use sluice_api::ffi::{
    AbiVersionFn, ConfigParamsFn, CreatePluginFn, PluginCreateResult, SLUICE_ABI_VERSION,
};
use sluice_api::task::TaskContext;
use sluice_api::writer::RecordWriterProvider;

use crate::error::EngineError;

/// Plugin kinds the host knows how to load. Each kind exports its own symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    RecordWriter,
    MessageDecoder,
}

impl PluginKind {
    fn abi_symbol(self) -> &'static str {
        match self {
            PluginKind::RecordWriter => "sluice_writer_abi_version",
            PluginKind::MessageDecoder => "sluice_decoder_abi_version",
        }
    }

    fn config_params_symbol(self) -> &'static str {
        match self {
            PluginKind::RecordWriter => "sluice_writer_config_params",
            PluginKind::MessageDecoder => "sluice_decoder_config_params",
        }
    }

    fn create_symbol(self) -> &'static str {
        match self {
            PluginKind::RecordWriter => "sluice_create_record_writer_provider",
            PluginKind::MessageDecoder => "sluice_create_message_decoder",
        }
    }
}

/// A loaded .so plugin library with ABI version already verified.
pub struct PluginLib {
    _lib: Library,
    config_params_fn: ConfigParamsFn,
    create_fn: CreatePluginFn,
}

impl PluginLib {
    /// Load a plugin .so from `path`, verify ABI version, resolve the symbols of `kind`.
    pub fn load(path: &Path, kind: PluginKind) -> Result<Self, EngineError> {
        let lib = unsafe { Library::new(path) }.map_err(|e| {
            EngineError::Config(format!("failed to load plugin '{}': {e}", path.display()))
        })?;

        let abi_fn: Symbol<AbiVersionFn> = unsafe { lib.get(kind.abi_symbol().as_bytes()) }
            .map_err(|e| missing_symbol(path, kind.abi_symbol(), e))?;

        let plugin_abi = unsafe { abi_fn() };
        if plugin_abi != SLUICE_ABI_VERSION {
            return Err(EngineError::Config(format!(
                "plugin '{}' ABI version mismatch: plugin={plugin_abi}, host={SLUICE_ABI_VERSION}",
                path.display()
            )));
        }

        let config_params_fn: ConfigParamsFn =
            *unsafe { lib.get::<ConfigParamsFn>(kind.config_params_symbol().as_bytes()) }
                .map_err(|e| missing_symbol(path, kind.config_params_symbol(), e))?;

        let create_fn: CreatePluginFn =
            *unsafe { lib.get::<CreatePluginFn>(kind.create_symbol().as_bytes()) }
                .map_err(|e| missing_symbol(path, kind.create_symbol(), e))?;

        Ok(Self {
            _lib: lib,
            config_params_fn,
            create_fn,
        })
    }

    /// Get plugin's declared config parameters.
    pub fn config_params(&self) -> Vec<ConfigParam> {
        let ptr = unsafe { (self.config_params_fn)() };
        if ptr.is_null() {
            return Vec::new();
        }
        unsafe { *Box::from_raw(ptr as *mut Vec<ConfigParam>) }
    }

    /// Keep the .so mapped for the rest of the process and hand out its create function.
    fn leak(self) -> CreatePluginFn {
        let create_fn = self.create_fn;
        std::mem::forget(self._lib);
        create_fn
    }
}

fn missing_symbol(path: &Path, symbol: &str, e: libloading::Error) -> EngineError {
    EngineError::Config(format!(
        "plugin '{}' missing {symbol} symbol: {e}",
        path.display()
    ))
}

/// Call a plugin's create function and take ownership of the error string on failure.
///
/// # Safety
///
/// `arg` must be what the plugin kind expects (see [`CreatePluginFn`]).
unsafe fn call_create(create_fn: CreatePluginFn, arg: *const ()) -> Result<*mut (), PluginError> {
    let result: PluginCreateResult = unsafe { create_fn(arg) };

    if result.plugin_ptr.is_null() {
        let msg = if !result.error_ptr.is_null() && result.error_len > 0 {
            // Reclaim the boxed slice allocated by the plugin.
            let bytes = unsafe {
                Box::from_raw(core::ptr::slice_from_raw_parts_mut(
                    result.error_ptr,
                    result.error_len,
                ))
            };
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            "unknown error".to_string()
        };
        return Err(PluginError::config(format!("plugin create failed: {msg}")));
    }

    Ok(result.plugin_ptr)
}

// ---------------------------------------------------------------------------
// Config parsing & validation (format-independent)
// ---------------------------------------------------------------------------

/// Parse plugin config into format-independent key-value pairs.
///
/// `config` is the plugin table of the job file, already deserialized from TOML.
///
/// - Rejects unknown keys (not declared in `params`).
/// - Converts `serde_json::Value` → `ParamValue` based on declared `ParamType`.
///
/// Returns only the keys that are present in the config source.
/// Defaults and required-checks are handled by `validate_and_build`.
pub fn parse_plugin_config(
    config: Option<&serde_json::Value>,
    params: &[ConfigParam],
) -> Result<HashMap<String, ParamValue>, EngineError> {
    let obj = match config {
        Some(serde_json::Value::Object(map)) => map,
        Some(_) => {
            return Err(EngineError::Config(
                "plugin config must be a table".into(),
            ));
        }
        None => return Ok(HashMap::new()),
    };

    let known: HashSet<&str> = params.iter().map(|p| p.name.as_str()).collect();
    for key in obj.keys() {
        if !known.contains(key.as_str()) {
            return Err(EngineError::Config(format!("unknown parameter '{key}'")));
        }
    }

    let mut result = HashMap::new();
    for param in params {
        if let Some(v) = obj.get(&param.name) {
            let pv = value_to_param_value(v, param)?;
            result.insert(param.name.clone(), pv);
        }
    }

    Ok(result)
}

/// Build `ConfigValues` from parsed key-value pairs.
///
/// For each declared param:
/// - If present in `parsed`: use the value.
/// - If absent but set in the job `properties`: use the property.
/// - If absent with default: use default value.
/// - If absent and required: return error.
pub fn validate_and_build(
    parsed: &HashMap<String, ParamValue>,
    params: &[ConfigParam],
    properties: &ConfigValues,
) -> Result<ConfigValues, EngineError> {
    let mut values = ConfigValues::new();

    for param in params {
        if let Some(v) = parsed.get(&param.name) {
            values.set(&param.name, v.clone());
        } else if let Some(v) = property_to_param_value(properties, param)? {
            values.set(&param.name, v);
        } else if let Some(ref default) = param.default {
            values.set(&param.name, default.clone());
        } else if param.required {
            return Err(EngineError::Config(format!(
                "missing required parameter '{}'",
                param.name
            )));
        }
    }

    Ok(values)
}

/// Parse and validate a plugin table against `params` in one step.
///
/// Declared params missing from the table are looked up in `properties`
/// before their defaults apply.
pub fn build_plugin_config(
    config: Option<&serde_json::Value>,
    params: &[ConfigParam],
    properties: &ConfigValues,
) -> Result<ConfigValues, EngineError> {
    let raw = parse_plugin_config(config, params)?;
    validate_and_build(&raw, params, properties)
}

/// Read a declared param from job properties, coerced to its declared type.
///
/// Property files carry everything as strings, so flags and numbers are
/// parsed from their text form.
fn property_to_param_value(
    properties: &ConfigValues,
    param: &ConfigParam,
) -> Result<Option<ParamValue>, EngineError> {
    let Some(raw) = properties.get(&param.name) else {
        return Ok(None);
    };
    let text = match raw {
        ParamValue::Str(s) => Some(s.trim()),
        _ => None,
    };
    let value = match param.param_type {
        ParamType::Bool => properties.get_bool(&param.name).map(ParamValue::Bool),
        ParamType::I64 => properties
            .get_i64(&param.name)
            .or_else(|| text.and_then(|t| t.parse().ok()))
            .map(ParamValue::I64),
        ParamType::U64 => properties
            .get_u64(&param.name)
            .or_else(|| text.and_then(|t| t.parse().ok()))
            .map(ParamValue::U64),
        ParamType::Str => Some(ParamValue::Str(match raw {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::I64(i) => i.to_string(),
            ParamValue::U64(u) => u.to_string(),
        })),
    };
    value.map(Some).ok_or_else(|| {
        EngineError::Config(format!(
            "property '{}': expected {:?}, got {raw:?}",
            param.name, param.param_type
        ))
    })
}

/// Convert a single value to a ParamValue according to the declared type.
fn value_to_param_value(
    val: &serde_json::Value,
    param: &ConfigParam,
) -> Result<ParamValue, EngineError> {
    match param.param_type {
        ParamType::Bool => {
            let b = val.as_bool().ok_or_else(|| {
                EngineError::Config(format!("parameter '{}': expected bool", param.name))
            })?;
            Ok(ParamValue::Bool(b))
        }
        ParamType::I64 => {
            let i = val.as_i64().ok_or_else(|| {
                EngineError::Config(format!("parameter '{}': expected integer", param.name))
            })?;
            Ok(ParamValue::I64(i))
        }
        ParamType::U64 => {
            let i = val.as_i64().ok_or_else(|| {
                EngineError::Config(format!("parameter '{}': expected integer", param.name))
            })?;
            if i < 0 {
                return Err(EngineError::Config(format!(
                    "parameter '{}': expected non-negative integer, got {i}",
                    param.name
                )));
            }
            Ok(ParamValue::U64(i as u64))
        }
        ParamType::Str => Ok(ParamValue::Str(flatten_value(val))),
    }
}

/// Flatten a value into a string for flat config transport.
///
/// Scalars are converted directly (no quoting).
/// Arrays and tables are serialized as JSON strings.
fn flatten_value(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => val.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Type-safe wrappers for specific plugin kinds
// ---------------------------------------------------------------------------

/// Builds a provider for one task.
pub type ProviderCtor = Arc<
    dyn Fn(&dyn TaskContext) -> Result<Box<dyn RecordWriterProvider>, PluginError> + Send + Sync,
>;

/// Builds a fresh, uninitialised decoder.
pub type DecoderCtor =
    Arc<dyn Fn() -> Result<Box<dyn MessageDecoder<Output = String>>, PluginError> + Send + Sync>;

/// A record writer provider implementation, either linked in or loaded from a .so.
///
/// Providers are built per task because they read the task's configuration.
#[derive(Clone)]
pub struct RecordWriterPlugin {
    name: String,
    params: Vec<ConfigParam>,
    ctor: ProviderCtor,
}

impl RecordWriterPlugin {
    pub fn builtin<F>(name: impl Into<String>, params: Vec<ConfigParam>, ctor: F) -> Self
    where
        F: Fn(&dyn TaskContext) -> Result<Box<dyn RecordWriterProvider>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            params,
            ctor: Arc::new(ctor),
        }
    }

    /// Load a record writer plugin from a .so file.
    ///
    /// 1. Load .so, verify ABI version.
    /// 2. Call `sluice_writer_config_params()` to get declared params.
    /// 3. Per task: call `sluice_create_record_writer_provider(&ctx)`.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let lib = PluginLib::load(path, PluginKind::RecordWriter)?;
        let params = lib.config_params();
        let create_fn = lib.leak();

        let ctor = move |ctx: &dyn TaskContext| -> Result<Box<dyn RecordWriterProvider>, PluginError> {
            let ctx_ref: &dyn TaskContext = ctx;
            let arg = &ctx_ref as *const &dyn TaskContext as *const ();
            let ptr = unsafe { call_create(create_fn, arg) }?;
            // Safety: the plugin returned a Box<Box<dyn RecordWriterProvider>>.
            Ok(unsafe { *Box::from_raw(ptr as *mut Box<dyn RecordWriterProvider>) })
        };

        tracing::info!(plugin = %path.display(), params = params.len(), "record writer plugin loaded");
        Ok(Self {
            name: path.display().to_string(),
            params,
            ctor: Arc::new(ctor),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ConfigParam] {
        &self.params
    }

    /// Validate the job's `[writer.config]` table against the declared params,
    /// falling back to job `properties` for params the table leaves out.
    pub fn configure(
        &self,
        config: Option<&serde_json::Value>,
        properties: &ConfigValues,
    ) -> Result<ConfigValues, EngineError> {
        build_plugin_config(config, &self.params, properties)
            .map_err(|e| e.with_context(format!("writer '{}'", self.name)))
    }

    pub fn create(&self, ctx: &dyn TaskContext) -> Result<Box<dyn RecordWriterProvider>, PluginError> {
        (self.ctor)(ctx)
    }
}

/// A message decoder implementation, either linked in or loaded from a .so.
#[derive(Clone)]
pub struct MessageDecoderPlugin {
    name: String,
    params: Vec<ConfigParam>,
    ctor: DecoderCtor,
}

impl MessageDecoderPlugin {
    pub fn builtin<F>(name: impl Into<String>, params: Vec<ConfigParam>, ctor: F) -> Self
    where
        F: Fn() -> Result<Box<dyn MessageDecoder<Output = String>>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            params,
            ctor: Arc::new(ctor),
        }
    }

    /// Load a message decoder plugin from a .so file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let lib = PluginLib::load(path, PluginKind::MessageDecoder)?;
        let params = lib.config_params();
        let create_fn = lib.leak();

        let ctor = move || -> Result<Box<dyn MessageDecoder<Output = String>>, PluginError> {
            let ptr = unsafe { call_create(create_fn, std::ptr::null()) }?;
            // Safety: the plugin returned a Box<Box<dyn MessageDecoder<Output = String>>>.
            Ok(unsafe { *Box::from_raw(ptr as *mut Box<dyn MessageDecoder<Output = String>>) })
        };

        tracing::info!(plugin = %path.display(), params = params.len(), "message decoder plugin loaded");
        Ok(Self {
            name: path.display().to_string(),
            params,
            ctor: Arc::new(ctor),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ConfigParam] {
        &self.params
    }

    /// Validate the job's `[decoder.config]` table against the declared params,
    /// falling back to job `properties` for params the table leaves out.
    pub fn configure(
        &self,
        config: Option<&serde_json::Value>,
        properties: &ConfigValues,
    ) -> Result<ConfigValues, EngineError> {
        build_plugin_config(config, &self.params, properties)
            .map_err(|e| e.with_context(format!("decoder '{}'", self.name)))
    }

    pub fn create(&self) -> Result<Box<dyn MessageDecoder<Output = String>>, PluginError> {
        (self.ctor)()
    }
}
