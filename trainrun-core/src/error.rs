//! Error types for config resolution

use thiserror::Error;

/// Errors that can occur while turning a config reference into a job definition
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No file matched the reference in the config folder or as a path
    #[error("Could not find config file {0}")]
    NotFound(String),

    /// The file exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file content is not valid JSON/YAML
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    /// The file extension is not one of the supported formats
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A required key is absent from the document
    #[error("Config file must have a '{0}' key")]
    MissingKey(&'static str),

    /// The `job` key names a kind the runner does not know
    #[error("Unknown job type {0}")]
    UnknownJobKind(String),

    /// The document has the required keys but the wrong shape
    #[error("Invalid job definition: {0}")]
    Invalid(String),
}
