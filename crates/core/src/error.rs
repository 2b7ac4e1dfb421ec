use thiserror::Error;

/// Errors produced by the core codecs and the coin model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The binary serialization is not a well-formed program.
    #[error("malformed encoding at byte {offset}: {reason}")]
    MalformedEncoding { offset: usize, reason: String },

    /// The text form could not be parsed.
    #[error("text parse error at character {position}: {reason}")]
    TextParse { position: usize, reason: String },

    /// A hex field could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// An atom does not fit the supported integer range.
    #[error("number out of range: {0}")]
    NumberRange(String),
}

impl CoreError {
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        CoreError::MalformedEncoding {
            offset,
            reason: reason.into(),
        }
    }
}
