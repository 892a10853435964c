//! Error types for layerkit

use thiserror::Error;

/// Result type alias for layerkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for layerkit
#[derive(Error, Debug)]
pub enum Error {
    /// A mandatory field ran out of input bytes while parsing
    #[error("truncated '{layer}': field '{field}' needs {needed} bytes, {available} available")]
    Truncated {
        layer: &'static str,
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// A layer parsed structurally but its validity predicate rejected it
    #[error("layer '{0}' failed validation")]
    LayerInvalid(&'static str),

    /// Serialize was attempted with a required field value missing
    #[error("missing value for field '{field}' in layer '{layer}'")]
    MissingValue {
        layer: &'static str,
        field: &'static str,
    },

    /// An integer does not fit its field width under the reject policy
    #[error("value {value:#x} does not fit in {width}-byte field '{field}'")]
    ValueTooLarge {
        field: &'static str,
        width: usize,
        value: u64,
    },

    /// A field value of the wrong kind was handed to a codec
    #[error("type mismatch for field '{field}': expected {expected}, got {found}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// Field name not present in the header type
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Header type name not present in the registry
    #[error("unknown header type '{0}'")]
    UnknownHeaderType(String),

    /// Malformed address text
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Custom codec failure
    #[error("codec error: {0}")]
    Codec(String),

    /// Wire I/O error
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a codec error with a custom message
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        Error::Codec(msg.into())
    }

    /// Create an invalid address error
    pub fn invalid_address<S: Into<String>>(msg: S) -> Self {
        Error::InvalidAddress(msg.into())
    }

    /// True for errors raised while decoding bytes (recoverable during
    /// dissection: the current body stays raw)
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Truncated { .. } | Error::LayerInvalid(_))
    }

    /// True for errors raised while encoding an instance (fatal to that
    /// serialize call)
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::MissingValue { .. } | Error::ValueTooLarge { .. } | Error::TypeMismatch { .. }
        )
    }
}
