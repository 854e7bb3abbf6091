//! Configuration error types.

/// Errors raised while loading, saving, or parsing configuration and
/// persisted preferences.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading a config or settings file failed.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that could not be read.
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a config or settings file failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File or directory that could not be written.
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file contents were not valid RON for the expected type.
    #[error("failed to parse config: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// Serializing to RON failed.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),

    /// No platform config directory could be determined and none was given.
    #[error("no config directory available on this platform")]
    NoConfigDir,
}
