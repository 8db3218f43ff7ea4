//! Error types for document parsing and manipulation

use std::path::PathBuf;
use thiserror::Error;

use crate::document::NodeId;

/// Result type for document operations
pub type Result<T> = std::result::Result<T, XmlError>;

/// Errors raised while reading, editing or writing a [`crate::Document`]
#[derive(Debug, Error)]
pub enum XmlError {
    // Parsing errors
    /// The source text is not well-formed XML
    #[error("XML parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset where the reader stopped
        position: u64,
        /// Reader diagnostic
        message: String,
    },

    /// The source text contains no element
    #[error("Document has no root element")]
    NoRoot,

    /// A second top-level element was found
    #[error("Document has more than one root element: found '{0}' after the root")]
    MultipleRoots(String),

    // Structural errors
    /// Operation requires an element but the node is text or a comment
    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// Operation requires a parent but the node is detached or is the root
    #[error("Node {0:?} has no parent")]
    Detached(NodeId),

    /// Operation requires a detached node but it is still attached
    #[error("Node {0:?} is already attached to the tree")]
    AlreadyAttached(NodeId),

    // Output errors
    /// Serializing the document failed
    #[error("XML write error: {0}")]
    Write(String),

    /// Reading or writing the backing file failed
    #[error("IO error on '{path}': {source}")]
    File {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl XmlError {
    /// Create a new `Parse` error
    pub fn parse(position: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a new `Write` error
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Create a new `File` error
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = XmlError::parse(42, "unexpected end");
        assert!(err.to_string().contains("byte 42"));
        assert!(err.to_string().contains("unexpected end"));

        let err = XmlError::MultipleRoots("other".to_string());
        assert!(err.to_string().contains("other"));

        let err = XmlError::file(
            "/tmp/skill.scxml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("skill.scxml"));
    }
}
