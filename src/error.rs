/// Error type shared by storage, messaging and the JS bridge
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("failed to decode stored value: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("browser bridge failure: {0}")]
    Bridge(String),
}

impl ArchiveError {
    /// Wrap a rejected JS promise or thrown value
    pub fn bridge(err: impl std::fmt::Debug) -> Self {
        ArchiveError::Bridge(format!("{:?}", err))
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
