//! Error types for the mixer bridge
//!
//! Configuration problems are fatal at compile time of the mapping table.
//! Per-call problems (unknown address, read-only field, bad value) are
//! returned to the caller of `set_value`. Decode failures on inbound
//! messages never surface here; they are logged and the message dropped.

use thiserror::Error;

/// Convenience alias used throughout the library
pub type Result<T> = std::result::Result<T, MixerError>;

/// Top-level error for every mixer operation
#[derive(Debug, Error)]
pub enum MixerError {
    /// The model registry or an address table is malformed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No mapping (primary or derived) exists for a logical address
    #[error("unknown address: {0}")]
    UnknownAddress(String),

    /// Write attempted on a derived field without a reverse transform
    #[error("field is read-only: {0}")]
    ReadOnlyField(String),

    /// A value could not be converted in either direction
    #[error("transform failed for {address}: {source}")]
    Transform {
        address: String,
        #[source]
        source: TransformError,
    },

    /// The mixer did not answer in time
    #[error("connection error: {0}")]
    Connection(String),

    /// The transport could not encode or deliver a message
    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MixerError {
    /// Wrap a transform failure with the address it happened on
    pub fn transform(address: impl Into<String>, source: TransformError) -> Self {
        MixerError::Transform {
            address: address.into(),
            source,
        }
    }
}

/// Failure of a single value conversion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("no label for wire code {0}")]
    UnknownCode(String),

    #[error("no wire code for label {0:?}")]
    UnknownLabel(String),

    #[error("unknown colour {0:?}")]
    UnknownColor(String),

    #[error("expected a number, got {0}")]
    NotNumeric(String),

    #[error("expected text, got {0}")]
    NotText(String),

    #[error("reply has no element {index} (length {len})")]
    MissingElement { index: usize, len: usize },

    #[error("transform {0} requires a scale range")]
    MissingScale(&'static str),
}
