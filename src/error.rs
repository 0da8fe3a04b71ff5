use thiserror::Error;

use crate::quiz::pool::AssetRef;

/// Errors from loading or querying the callout pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("callout source is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("callout source is not a mapping of map -> callout -> image")]
    Malformed,
    #[error("unknown map \"{0}\"")]
    UnknownTopic(String),
    #[error("unknown callout \"{label}\" on {topic}")]
    UnknownLabel { topic: String, label: String },
}

/// Errors reported back to whoever triggered a quiz start.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("unknown map \"{0}\"")]
    UnknownTopic(String),
    #[error("a quiz is already running in this chat")]
    AlreadyRunning,
}

/// Errors a delivery collaborator may report back to the session loop.
///
/// None of these abort a running session. A missing image gets the
/// placeholder asset, anything else skips the question.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("image for {0} is unavailable")]
    AssetUnavailable(AssetRef),
    #[error("delivery failed: {0}")]
    Failed(String),
}
