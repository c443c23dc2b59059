use sluice_api::ConfigParams;

use crate::delimiter::DEFAULT_RECORD_DELIMITER;

/// Key of the record delimiter in the task configuration.
pub const RECORD_DELIMITER: &str = "etl.output.record.delimiter";

/// Plugin parameters of the byte-array writer.
///
/// Compression is not declared here: it is framework-level and read through
/// the task context.
#[derive(Debug, ConfigParams)]
pub struct ByteArrayConfig {
    #[param(
        key = "etl.output.record.delimiter",
        description = "Delimiter appended after every record; \"null\" (any case) selects the NUL byte"
    )]
    pub record_delimiter: String,
}

impl Default for ByteArrayConfig {
    fn default() -> Self {
        Self {
            record_delimiter: DEFAULT_RECORD_DELIMITER.to_string(),
        }
    }
}
