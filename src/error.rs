//! Error module for the netloom library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq)]
pub enum NetError {
    /// Error for binding a producer to a consumer of an incompatible type.
    /// Raised at bind time, never during coupling execution.
    TypeMismatch { expected: String, found: String },
    /// Error for a reference to an element that no longer exists (or never did),
    /// e.g., a synapse endpoint or coupling endpoint missing after reconstruction.
    DanglingReference(String),
    /// Error for an iterative procedure applied before its input/target data exists.
    DataNotInitialized(String),
    /// Error for mismatched vector/matrix dimensions in numeric utilities.
    IllegalArgument(String),
    /// Error for invalid parameters.
    InvalidParameter(String),
    /// Error for I/O operations.
    IoError(String),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NetError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            NetError::DanglingReference(e) => write!(f, "Dangling reference: {}", e),
            NetError::DataNotInitialized(e) => write!(f, "Data not initialized: {}", e),
            NetError::IllegalArgument(e) => write!(f, "Illegal argument: {}", e),
            NetError::InvalidParameter(e) => write!(f, "Invalid parameter: {}", e),
            NetError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for NetError {}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        NetError::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for NetError {
    fn from(e: serde_json::Error) -> Self {
        NetError::IoError(e.to_string())
    }
}
