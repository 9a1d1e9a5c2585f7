//! Error conversion implementations

use super::types::Error;
use std::path::PathBuf;

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serialization {
            key: String::new(),
            operation: "decode",
            source: error,
        }
    }
}
