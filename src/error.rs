//! Library error types

use thiserror::Error;

/// Errors surfaced by pool operations.
///
/// Invalid-input and capacity rejections are deliberately NOT errors: the
/// pool must never propagate a failure into the host tick loop, so those
/// paths return outcome enums or `None` instead.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The host refused to take custody of a record.
    #[error("custody transfer rejected by host: {0}")]
    CustodyTransfer(String),

    /// A condition was targeted at a body part the actor no longer has.
    #[error("body part `{0}` is missing")]
    MissingPart(String),

    #[error("unsupported save version: {0}")]
    UnsupportedVersion(u8),

    #[error("save decode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("save decode failed: {0}")]
    Binary(#[from] bincode::Error),
}
