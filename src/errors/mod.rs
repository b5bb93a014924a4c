/// Error taxonomy for the stream client
///
/// None of these errors is fatal to the process. Transport errors are
/// recovered by the reconnection supervisor, classification errors drop a
/// single frame, and subscription send errors are deferred until the next
/// successful connect.
use thiserror::Error;

/// Why an inbound frame could not be turned into an event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("frame declares neither a channel nor a type")]
    MissingChannel,

    #[error("unknown severity level: {0}")]
    UnknownLevel(String),
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Subscription not sent: {reason}")]
    SubscriptionSend { reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StreamError {
    /// Errors the supervisor recovers from by reconnecting or deferring
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StreamError::Transport(_) | StreamError::SubscriptionSend { .. }
        )
    }

    pub fn transport(context: &str, error: impl std::fmt::Display) -> Self {
        StreamError::Transport(format!("{}: {}", context, error))
    }
}
