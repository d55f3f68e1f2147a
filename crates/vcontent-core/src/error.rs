#![forbid(unsafe_code)]

use thiserror::Error;

use crate::registry::InstanceId;

pub type Result<T> = std::result::Result<T, VirtualContentError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VirtualContentError {
    #[error("content must be a string, a number, or empty; got {found}")]
    InvalidContentType { found: &'static str },

    #[error("unsupported host reference: {reason}")]
    InvalidHostReference { reason: String },

    #[error("bad chunk index {index} (chunk count {chunk_count})")]
    BadChunkIndex { index: usize, chunk_count: usize },

    #[error("instance {id} is already tracked")]
    AlreadyTracked { id: InstanceId },

    #[error("instance has been destroyed")]
    Destroyed,

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl VirtualContentError {
    #[must_use]
    pub fn invalid_host(reason: impl Into<String>) -> Self {
        Self::InvalidHostReference {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the error signals a logic defect in the caller or the engine
    /// rather than bad input.
    #[must_use]
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::BadChunkIndex { .. } | Self::AlreadyTracked { .. } | Self::Destroyed
        )
    }
}
