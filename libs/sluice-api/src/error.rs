use std::fmt;

/// Error kind for plugin errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Io,
}

/// Plugin error — returned by all plugin trait methods.
#[derive(Debug)]
pub struct PluginError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PluginError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PluginError {}

impl From<std::io::Error> for PluginError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_kind() {
        let err = PluginError::io("permission denied").with_context("open /data/out-m-00000");

        assert_eq!(err.kind, ErrorKind::Io);
        assert_eq!(err.message, "open /data/out-m-00000: permission denied");
        assert_eq!(err.to_string(), "Io: open /data/out-m-00000: permission denied");
    }

    #[test]
    fn test_every_kind_has_a_constructor() {
        for err in [PluginError::config("bad key"), PluginError::io("disk full")] {
            let name = match err.kind {
                ErrorKind::Config => "Config",
                ErrorKind::Io => "Io",
            };
            assert!(err.to_string().starts_with(name), "{err}");
        }
    }

    #[test]
    fn test_io_error_maps_to_io_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "file exists");
        let err: PluginError = io.into();

        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.message.contains("file exists"));
    }
}
