/// Real-time update stream client
///
/// Keeps a live connection to a push source, subscribes to named channels,
/// classifies inbound frames into typed events and fans them out to a
/// bounded history, rolling per-channel stats and short-lived notifications.
/// When the very first connection attempt fails, a synthetic generator feeds
/// the same pipeline so consumers always have data to show.
///
/// ## Key Components
/// - `transport`: one physical WebSocket connection per handle
/// - `supervisor`: pure connection state machine (state, event) -> (state, effects)
/// - `subscription`: desired channel set, re-sent after every connect
/// - `classifier`: raw frame -> `InboundEvent`, malformed frames dropped
/// - `history`, `stats`, `notifications`: fan-out consumers
/// - `fallback`: synthetic event generator
/// - `client`: the consumer-facing `StreamClient` and its driver task
pub mod classifier;
pub mod client;
pub mod fallback;
pub mod history;
pub mod message;
pub mod metrics;
pub mod notifications;
pub mod stats;
pub mod subscription;
pub mod supervisor;
pub mod transport;
pub mod types;

pub use client::StreamClient;
pub use history::HistoryBuffer;
pub use metrics::{StreamMetrics, StreamMetricsSnapshot};
pub use notifications::{Notification, NotificationCenter};
pub use stats::{AggregateStats, DeliveryStats, InventoryStats, OrderStats, StatsAggregator};
pub use transport::{Connector, TransportConnection, WebSocketConnector};
pub use types::{ChannelSet, ConnectionState, HistoryEntry, InboundEvent, Severity};
