// Mon Oct 12 2026 - Alex

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("No type found at {file}:{line}:{column}")]
    SourceUnresolved { file: String, line: u32, column: u32 },
    #[error("Unable to open symbol source {path}: {reason}")]
    SessionUnavailable { path: PathBuf, reason: String },
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
    #[error("Size mismatch for {type_name}: computed {computed} bytes, source reports {reported} bytes")]
    SizeMismatch { type_name: String, computed: i64, reported: i64 },
    #[error("Unable to write layout to {path}: {source}")]
    SerializationFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed layout data: {0}")]
    MalformedArtifact(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl LayoutError {
    /// Recoverable conditions are reported and the request carries on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnresolved { .. } | Self::SymbolNotFound(_) | Self::SizeMismatch { .. }
        )
    }
}
