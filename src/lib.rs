pub mod arguments;
pub mod config;
pub mod errors; // Stream error taxonomy
pub mod logger;
pub mod stream;

pub use config::StreamConfig;
pub use errors::{ClassificationError, StreamError};
pub use stream::{
    AggregateStats, ChannelSet, ConnectionState, HistoryEntry, InboundEvent, Notification,
    Severity, StreamClient,
};
