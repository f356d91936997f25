//! Error types for serialization

use std::fmt;

/// Errors that can occur while serializing a document
#[derive(Debug, Clone, PartialEq)]
pub enum SerializeError {
    /// Input HTML or embedded metadata could not be parsed
    ParseError(String),
    /// Round-trip metadata is missing or inconsistent
    MetadataError(String),
    /// A source range (DSR) is invalid for the current page source
    SourceRange(String),
    /// A handler failed while emitting markup
    SerializationError(String),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            SerializeError::MetadataError(msg) => write!(f, "Metadata error: {msg}"),
            SerializeError::SourceRange(msg) => write!(f, "Invalid source range: {msg}"),
            SerializeError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SerializeError {}
