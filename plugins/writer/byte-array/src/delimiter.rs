use std::fmt;
use std::sync::Arc;

/// Token that selects the NUL byte as delimiter (compared ignoring ASCII case).
pub const DEFAULT_RECORD_DELIMITER: &str = "null";

/// Byte sequence appended after every record.
///
/// Cheap to clone: every writer of a provider shares the same bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Delimiter(Arc<[u8]>);

impl Delimiter {
    /// `"null"` in any case → `[0x00]`; anything else → its UTF-8 bytes as-is.
    pub fn parse(token: &str) -> Self {
        if token.eq_ignore_ascii_case(DEFAULT_RECORD_DELIMITER) {
            Self(Arc::from(&[0u8][..]))
        } else {
            Self(Arc::from(token.as_bytes()))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::parse(DEFAULT_RECORD_DELIMITER)
    }
}

impl fmt::Debug for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Delimiter({:02x?})", &self.0[..])
    }
}
