/// Parameter type for plugin configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    I64,
    U64,
    Str,
}

/// Declaration of a single config parameter.
///
/// Plugins export these via their `sluice_*_config_params()` symbol.
/// The host validates the job's plugin table against them BEFORE creating the plugin.
#[derive(Debug, Clone)]
pub struct ConfigParam {
    /// Full key, e.g. `etl.output.record.delimiter`.
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub description: String,
}

/// Typed config value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    Str(String),
}

impl ParamValue {
    /// Infer a value from an untyped source (framework properties have no declarations).
    ///
    /// Floats, arrays and tables are kept as their JSON text.
    pub fn infer(val: &serde_json::Value) -> Self {
        match val {
            serde_json::Value::Bool(b) => ParamValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::I64(i),
                None => ParamValue::Str(n.to_string()),
            },
            serde_json::Value::String(s) => ParamValue::Str(s.clone()),
            serde_json::Value::Null => ParamValue::Str(String::new()),
            other => ParamValue::Str(other.to_string()),
        }
    }
}

/// Key/value configuration of one task.
///
/// Holds both framework-level properties (compression flag, codec name) and
/// the validated parameters of the plugins the task runs. Lookups are by full key;
/// a value of the wrong type reads as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigValues {
    entries: Vec<(String, ParamValue)>,
}

impl ConfigValues {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder form of [`ConfigValues::set`].
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == &name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Overlay `other` on top of `self`; keys present in both take `other`'s value.
    pub fn merge(&mut self, other: &ConfigValues) {
        for (k, v) in &other.entries {
            self.set(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => Some(*v),
            // Hadoop-style property files carry flags as strings, in any case.
            Some(ParamValue::Str(s)) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ParamValue::I64(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(ParamValue::U64(v)) => Some(*v),
            // Most config formats lack unsigned integers — accept non-negative i64.
            Some(ParamValue::I64(v)) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ParamValue::Str(v)) => Some(v),
            _ => None,
        }
    }
}
