//! Errors specific to key sequences
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enum of errors associated with a key sequence
pub enum Error {
    /// This error occurs when an advance tries to move past the last
    /// position of the keyspace. The sequence cannot be recovered.
    KeyspaceExhausted,
    /// Error occurs when a serialized state carries a version other than the
    /// single supported one. The offending version string is included.
    UnknownSerializationVersion(String),
    /// Error occurs when a serialized state cannot be decoded at all: not
    /// valid JSON, missing or unknown fields, or invalid base64.
    MalformedPayload(String),
    /// Error occurs when the size of a serialized node key is not the size
    /// the payload declares.
    InvalidNodeKeySize(usize),
    /// Error occurs when a serialized node carries height zero, which no
    /// reachable state produces.
    InvalidNodeHeight,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::KeyspaceExhausted => write!(f, "keyspace exhausted"),
            Error::UnknownSerializationVersion(_) => write!(f, "unknown serialization version"),
            Error::MalformedPayload(reason) => write!(f, "malformed payload: {}", reason),
            Error::InvalidNodeKeySize(size) => write!(f, "invalid node key size: {}", size),
            Error::InvalidNodeHeight => write!(f, "invalid node height"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::MalformedPayload(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Error {
        Error::MalformedPayload(err.to_string())
    }
}
