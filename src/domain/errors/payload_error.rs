use thiserror::Error;

/// A notification payload that cannot be turned into a record.
#[derive(Debug, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PayloadError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no usable id")]
    MissingId,

    #[error("payload has no message text")]
    MissingMessage,

    #[error("malformed payload: {message}")]
    Malformed { message: String },
}

impl PayloadError {
    /// Creates malformed payload error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}
