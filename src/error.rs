use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Corrupt snapshot data: {0}")]
    CorruptData(String),
}

impl SnapshotError {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        SnapshotError::CorruptData(message.into())
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
