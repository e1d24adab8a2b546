use super::types::StreamId;

/// Failure of a hardware property get/set/subscribe call
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("property not supported")]
    Unsupported,
    #[error("stream not found: {0}")]
    NotFound(StreamId),
    #[error("request rejected ({status}): {reason}")]
    Rejected { status: i32, reason: String },
    #[error("backend error: {0}")]
    Backend(String),
}
