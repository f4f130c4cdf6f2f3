//! Errors raised while decoding or encoding wire-level values

/// Errors shared by both ends of the grid protocol.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Requested output format is not one the serializer knows about.
    #[error("The output format '{0}' is not supported")]
    UnsupportedFormat(String),

    /// A reserved query parameter could not be interpreted.
    #[error("Invalid value '{value}' for parameter '{name}'")]
    InvalidParameter { name: String, value: String },

    /// Requested CSV character set is not known.
    #[error("The encoding '{0}' is not supported")]
    UnsupportedEncoding(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
