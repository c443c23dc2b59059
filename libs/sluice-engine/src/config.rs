use std::path::{Path, PathBuf};

use serde::Deserialize;
use sluice_api::config::{ConfigValues, ParamValue};

use crate::error::EngineError;

/// Root job configuration, parsed from TOML.
///
/// ```toml
/// name = "page-views"
/// output_dir = "/data/page-views"
/// inputs = ["spool/part-0", "spool/part-1"]
///
/// [properties]
/// "mapreduce.output.fileoutputformat.compress" = true
/// "etl.output.codec" = "gzip"
///
/// [writer.config]
/// "etl.output.record.delimiter" = "\n"
///
/// [decoder]
/// topic = "page-views"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Job name; part of every task attempt id.
    pub name: String,

    /// Directory committed files land in.
    pub output_dir: PathBuf,

    /// Base name of output files. Defaults to the job name.
    #[serde(default)]
    pub file_name: Option<String>,

    /// One task per input file, in order; the index is the task partition.
    pub inputs: Vec<PathBuf>,

    /// Framework-level task properties (compression flag, codec name, ...).
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub writer: PluginConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// Plugin selection. Without `plugin` the built-in implementation is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginConfig {
    /// Path to the plugin .so.
    #[serde(default)]
    pub plugin: Option<PathBuf>,
    /// Plugin parameters, validated against the plugin's declarations.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecoderConfig {
    /// Source topic name handed to the decoder. Defaults to the job name.
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(flatten)]
    pub plugin: PluginConfig,
}

impl JobConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| e.with_context(path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: JobConfig =
            toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Config("job name must not be empty".into()));
        }
        if self.inputs.is_empty() {
            return Err(EngineError::Config(format!(
                "job '{}' has no inputs",
                self.name
            )));
        }
        Ok(())
    }

    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(&self.name)
    }

    pub fn topic(&self) -> &str {
        self.decoder.topic.as_deref().unwrap_or(&self.name)
    }

    /// Framework properties as untyped task configuration.
    pub fn property_values(&self) -> ConfigValues {
        let mut values = ConfigValues::new();
        for (key, val) in &self.properties {
            values.set(key.clone(), ParamValue::infer(val));
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use sluice_api::task::{COMPRESS_OUTPUT, OUTPUT_CODEC};

    use super::*;

    const FULL: &str = r#"
name = "page-views"
output_dir = "/data/page-views"
file_name = "views"
inputs = ["spool/part-0", "spool/part-1"]

[properties]
"mapreduce.output.fileoutputformat.compress" = true
"etl.output.codec" = "snappy"

[writer]
plugin = "plugins/libsluice_writer_byte_array.so"

[writer.config]
"etl.output.record.delimiter" = "|"

[decoder]
topic = "PageViewEvent"
"#;

    #[test]
    fn test_parse_full() {
        let cfg = JobConfig::parse(FULL).unwrap();

        assert_eq!(cfg.name, "page-views");
        assert_eq!(cfg.file_name(), "views");
        assert_eq!(cfg.topic(), "PageViewEvent");
        assert_eq!(cfg.inputs.len(), 2);
        assert_eq!(
            cfg.writer.plugin.as_deref(),
            Some(Path::new("plugins/libsluice_writer_byte_array.so"))
        );
        assert_eq!(
            cfg.writer.config,
            Some(serde_json::json!({ "etl.output.record.delimiter": "|" }))
        );
        assert!(cfg.decoder.plugin.plugin.is_none());

        let props = cfg.property_values();
        assert_eq!(props.get_bool(COMPRESS_OUTPUT), Some(true));
        assert_eq!(props.get_str(OUTPUT_CODEC), Some("snappy"));
    }

    #[test]
    fn test_defaults() {
        let cfg = JobConfig::parse(
            r#"
name = "clicks"
output_dir = "out"
inputs = ["in.txt"]
"#,
        )
        .unwrap();

        assert_eq!(cfg.file_name(), "clicks");
        assert_eq!(cfg.topic(), "clicks");
        assert!(cfg.properties.is_empty());
        assert!(cfg.writer.plugin.is_none());
        assert!(cfg.writer.config.is_none());
    }

    #[test]
    fn test_rejects_empty_inputs() {
        let err = JobConfig::parse(
            r#"
name = "clicks"
output_dir = "out"
inputs = []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no inputs"), "{err}");
    }

    #[test]
    fn test_rejects_missing_output_dir() {
        let err = JobConfig::parse("name = \"x\"\ninputs = [\"a\"]\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
