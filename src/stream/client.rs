/// Consumer-facing stream client
///
/// `StreamClient` owns one driver task per `connect`. The driver is the single
/// event loop of the subsystem: transport tasks, timers and the synthetic
/// generator post `DriverEvent`s into one queue and the driver handles them one
/// at a time. Every producer is tagged with a generation number; events from a
/// cancelled timer, a closed transport or a stopped generator are discarded.
///
/// Snapshots (state, history, stats, notifications, channels) live in `Shared`
/// and are read by consumers without touching the driver.
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::classifier::classify;
use super::fallback::SyntheticGenerator;
use super::history::HistoryBuffer;
use super::message::ClientMessage;
use super::metrics::{StreamMetrics, StreamMetricsSnapshot};
use super::notifications::{Notification, NotificationCenter};
use super::stats::{AggregateStats, StatsAggregator};
use super::subscription::SubscriptionManager;
use super::supervisor::{transition, Effect, SupervisorEvent, SupervisorState};
use super::transport::{
    generate_client_id, stream_url, Connector, FrameSender, TransportConnection, TransportEvent,
    WebSocketConnector,
};
use super::types::{ChannelSet, ConnectionState, HistoryEntry};
use crate::config::{validate_base_url, StreamConfig};
use crate::errors::StreamError;
use crate::logger::{self, LogTag};

// ============================================================================
// DRIVER EVENTS
// ============================================================================

#[derive(Debug)]
enum DriverEvent {
    Command(Command),
    Transport { generation: u64, event: TransportEvent },
    ReconnectDue { generation: u64 },
    FallbackDue { generation: u64 },
    SyntheticTick { generation: u64, raw: String },
}

#[derive(Debug)]
enum Command {
    SetChannels(ChannelSet),
    Refresh,
    Shutdown(Option<oneshot::Sender<()>>),
}

/// One-shot timer whose firing carries the generation it was scheduled under
#[derive(Debug, Default)]
struct Timer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    fn schedule(
        &mut self,
        delay: Duration,
        tx: &mpsc::UnboundedSender<DriverEvent>,
        make_event: fn(u64) -> DriverEvent,
    ) {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let tx = tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make_event(generation));
        }));
    }

    fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    /// Accept a firing only if it belongs to the pending schedule
    fn fire(&mut self, generation: u64) -> bool {
        if self.handle.is_some() && generation == self.generation {
            self.handle = None;
            true
        } else {
            false
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// ============================================================================
// SHARED SNAPSHOTS
// ============================================================================

struct Shared {
    history: RwLock<HistoryBuffer>,
    stats: RwLock<StatsAggregator>,
    notifications: RwLock<NotificationCenter>,
    channels: RwLock<ChannelSet>,
    metrics: StreamMetrics,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<HistoryEntry>,
}

impl Shared {
    fn new(config: &StreamConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            history: RwLock::new(HistoryBuffer::new(config.history_capacity)),
            stats: RwLock::new(StatsAggregator::new()),
            notifications: RwLock::new(NotificationCenter::new(
                config.notification_capacity,
                config.notification_ttl(),
            )),
            channels: RwLock::new(config.channel_set()),
            metrics: StreamMetrics::new(),
            state_tx,
            events_tx,
        }
    }
}

// ============================================================================
// DRIVER
// ============================================================================

struct Driver {
    tx: mpsc::UnboundedSender<DriverEvent>,
    base_url: String,
    config: StreamConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    state: SupervisorState,
    subscriptions: SubscriptionManager,
    transport: Option<TransportConnection>,
    transport_generation: u64,
    reconnect_timer: Timer,
    fallback_timer: Timer,
    generator: SyntheticGenerator,
}

impl Driver {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<DriverEvent>) {
        self.apply(SupervisorEvent::Start);

        while let Some(event) = rx.recv().await {
            if !self.handle(event) {
                break;
            }
        }

        logger::debug(LogTag::Supervisor, "Driver task exiting");
    }

    /// Handle one event; returns false when the driver should stop
    fn handle(&mut self, event: DriverEvent) -> bool {
        match event {
            DriverEvent::Transport { generation, event } => {
                if generation != self.transport_generation {
                    logger::verbose(
                        LogTag::Transport,
                        &format!("Ignoring stale transport event {:?}", event),
                    );
                    return true;
                }
                self.on_transport_event(event);
            }
            DriverEvent::ReconnectDue { generation } => {
                if self.reconnect_timer.fire(generation) {
                    self.apply(SupervisorEvent::ReconnectDue);
                }
            }
            DriverEvent::FallbackDue { generation } => {
                if self.fallback_timer.fire(generation) {
                    self.apply(SupervisorEvent::FallbackDue);
                }
            }
            DriverEvent::SyntheticTick { generation, raw } => {
                if self.state.generator_active && self.generator.is_current(generation) {
                    self.shared.metrics.inc_synthetic_events();
                    self.ingest(&raw);
                } else {
                    logger::verbose(LogTag::Fallback, "Ignoring stale synthetic tick");
                }
            }
            DriverEvent::Command(Command::SetChannels(channels)) => self.set_channels(channels),
            DriverEvent::Command(Command::Refresh) => self.refresh(),
            DriverEvent::Command(Command::Shutdown(ack)) => {
                self.apply(SupervisorEvent::Teardown);
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                return false;
            }
        }
        true
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                logger::info(LogTag::Transport, &format!("Connected to {}", self.base_url));
                self.apply(SupervisorEvent::Opened);
            }
            TransportEvent::Message(raw) => {
                self.shared.metrics.inc_frames_received();
                self.ingest(&raw);
            }
            TransportEvent::Closed(reason) => {
                logger::warning(
                    LogTag::Transport,
                    &format!(
                        "Connection closed: {}",
                        reason.as_deref().unwrap_or("no reason given")
                    ),
                );
                self.apply(SupervisorEvent::ConnectionLost);
            }
            TransportEvent::Error(err) => {
                logger::warning(LogTag::Transport, &format!("Connection error: {}", err));
                self.apply(SupervisorEvent::ConnectionLost);
            }
        }
    }

    fn apply(&mut self, event: SupervisorEvent) {
        let previous = self.state;
        let result = transition(&previous, event);

        if result.effects.is_empty() && result.next == previous {
            logger::verbose(
                LogTag::Supervisor,
                &format!("{:?} ignored in state {}", event, previous.connection),
            );
            return;
        }

        self.state = result.next;
        for effect in &result.effects {
            self.execute(*effect);
        }

        if result.changes_connection(&previous) {
            logger::info(
                LogTag::Supervisor,
                &format!(
                    "Connection state: {} -> {}",
                    previous.connection, self.state.connection
                ),
            );
            self.shared.state_tx.send_replace(self.state.connection);
        }
    }

    fn execute(&mut self, effect: Effect) {
        logger::debug(LogTag::Supervisor, &format!("Effect: {:?}", effect));

        match effect {
            Effect::OpenTransport => self.open_transport(),
            Effect::CloseTransport => {
                self.transport_generation += 1;
                if let Some(mut transport) = self.transport.take() {
                    transport.close();
                }
            }
            Effect::ScheduleReconnect => {
                self.shared.metrics.inc_reconnects_scheduled();
                let delay = self.config.reconnect_delay();
                logger::info(
                    LogTag::Supervisor,
                    &format!("Reconnecting in {} ms", delay.as_millis()),
                );
                self.reconnect_timer.schedule(delay, &self.tx, |generation| {
                    DriverEvent::ReconnectDue { generation }
                });
            }
            Effect::CancelReconnect => {
                self.reconnect_timer.cancel();
            }
            Effect::ScheduleFallback => {
                let delay = self.config.fallback_activation_delay();
                logger::debug(
                    LogTag::Fallback,
                    &format!("Fallback activation in {} ms", delay.as_millis()),
                );
                self.fallback_timer.schedule(delay, &self.tx, |generation| {
                    DriverEvent::FallbackDue { generation }
                });
            }
            Effect::CancelFallback => {
                self.fallback_timer.cancel();
            }
            Effect::StartGenerator => {
                let tx = self.tx.clone();
                let started = self.generator.start(move |generation, raw| {
                    tx.send(DriverEvent::SyntheticTick { generation, raw }).is_ok()
                });
                if started {
                    logger::warning(
                        LogTag::Fallback,
                        "Live source unavailable, serving synthetic events",
                    );
                }
            }
            Effect::StopGenerator => {
                self.generator.stop();
            }
            Effect::ResendSubscriptions => {
                let Some(transport) = self.transport.as_ref() else {
                    return;
                };
                match self.subscriptions.on_connected(transport) {
                    Ok(()) => self.shared.metrics.inc_subscribe_frames_sent(),
                    Err(e) => {
                        self.shared.metrics.inc_sends_dropped();
                        logger::warning(LogTag::Subscription, &e.to_string());
                    }
                }
            }
        }
    }

    fn open_transport(&mut self) {
        if let Some(mut previous) = self.transport.take() {
            previous.close();
        }
        self.transport_generation += 1;
        let generation = self.transport_generation;

        let client_id = generate_client_id();
        let url = stream_url(&self.base_url, &client_id);
        self.shared.metrics.inc_connect_attempts();

        logger::info(
            LogTag::Transport,
            &format!("Connecting to {} (attempt {})", url, self.state.attempts),
        );

        let tx = self.tx.clone();
        self.transport = Some(TransportConnection::open(
            self.connector.clone(),
            url,
            client_id,
            move |event| {
                let _ = tx.send(DriverEvent::Transport { generation, event });
            },
        ));
    }

    fn connected_sender(&self) -> Option<&dyn FrameSender> {
        if !self.state.connection.is_connected() {
            return None;
        }
        self.transport.as_ref().map(|t| t as &dyn FrameSender)
    }

    fn set_channels(&mut self, channels: ChannelSet) {
        *self.shared.channels.write() = channels.clone();

        let sender = if self.state.connection.is_connected() {
            self.transport.as_ref().map(|t| t as &dyn FrameSender)
        } else {
            None
        };

        match self.subscriptions.set_channels(channels, sender) {
            Ok(()) => self.shared.metrics.inc_subscribe_frames_sent(),
            Err(StreamError::SubscriptionSend { reason }) => {
                logger::debug(LogTag::Subscription, &format!("Subscription deferred: {}", reason));
            }
            Err(e) => logger::warning(LogTag::Subscription, &e.to_string()),
        }
    }

    fn refresh(&self) {
        let Some(sender) = self.connected_sender() else {
            self.shared.metrics.inc_sends_dropped();
            logger::debug(LogTag::Transport, "Refresh ignored: not connected");
            return;
        };

        match ClientMessage::refresh(Utc::now()).to_json() {
            Ok(json) => {
                if !sender.send(&json) {
                    self.shared.metrics.inc_sends_dropped();
                }
            }
            Err(e) => logger::error(LogTag::Transport, &e.to_string()),
        }
    }

    /// Classify one raw frame and fan it out: history, stats, notifications, subscribers
    fn ingest(&self, raw: &str) {
        let received_at = Utc::now();

        let event = match classify(raw, received_at) {
            Ok(event) => event,
            Err(e) => {
                self.shared.metrics.inc_frames_dropped();
                logger::warning(LogTag::Classifier, &format!("Dropping frame: {}", e));
                logger::verbose(LogTag::Classifier, &format!("Dropped frame body: {}", raw));
                return;
            }
        };

        logger::debug(
            LogTag::Classifier,
            &format!("[{}] {}: {}", event.channel, event.level, event.message),
        );

        let entry = self.shared.history.write().push(event);

        if self.shared.stats.write().record(&entry.event) {
            logger::debug(
                LogTag::Stats,
                &format!("Stats updated by {} event", entry.event.channel),
            );
        }

        if let Some(notification) = self
            .shared
            .notifications
            .write()
            .push(&entry.event, received_at)
        {
            logger::debug(
                LogTag::Notifications,
                &format!("Notification {}: {}", notification.id, notification.title),
            );
        }

        // No receivers is fine
        let _ = self.shared.events_tx.send(entry);
    }
}

// ============================================================================
// CLIENT
// ============================================================================

struct DriverHandle {
    tx: mpsc::UnboundedSender<DriverEvent>,
    task: JoinHandle<()>,
}

/// Real-time update stream client
///
/// Independent instances share nothing. History, stats and notifications
/// survive `disconnect()`/`connect()` cycles and only go away with the client.
pub struct StreamClient {
    config: StreamConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    driver: Mutex<Option<DriverHandle>>,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    /// Client over a custom transport connector
    pub fn with_connector(config: StreamConfig, connector: Arc<dyn Connector>) -> Self {
        let shared = Arc::new(Shared::new(&config));
        Self {
            config,
            connector,
            shared,
            driver: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Start the connection lifecycle against `base_url`
    ///
    /// Must be called from within a tokio runtime. Calling it while already
    /// running is a no-op.
    pub fn connect(&self, base_url: &str) -> Result<(), StreamError> {
        validate_base_url(base_url)?;
        self.config.validate_limits()?;

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            StreamError::Configuration(format!("connect requires a tokio runtime: {}", e))
        })?;

        let mut driver = self.driver.lock();
        if let Some(existing) = driver.as_ref() {
            if !existing.task.is_finished() {
                logger::debug(LogTag::System, "connect() ignored: client already running");
                return Ok(());
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let initial_channels = self.shared.channels.read().clone();

        let worker = Driver {
            tx: tx.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            config: self.config.clone(),
            connector: self.connector.clone(),
            shared: self.shared.clone(),
            state: SupervisorState::default(),
            subscriptions: SubscriptionManager::new(initial_channels),
            transport: None,
            transport_generation: 0,
            reconnect_timer: Timer::default(),
            fallback_timer: Timer::default(),
            generator: SyntheticGenerator::new(self.config.fallback_interval()),
        };

        logger::info(LogTag::System, &format!("Stream client starting ({})", base_url));
        let task = runtime.spawn(worker.run(rx));
        *driver = Some(DriverHandle { tx, task });

        Ok(())
    }

    /// Connect to the configured `base_url`
    pub fn connect_configured(&self) -> Result<(), StreamError> {
        let base_url = self.config.base_url.clone();
        self.connect(&base_url)
    }

    /// Replace the desired channel set
    ///
    /// Recorded immediately; sent to the source right away when connected,
    /// otherwise with the next successful connect.
    pub fn set_channels<I, S>(&self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: ChannelSet = channels.into_iter().map(Into::into).collect();
        *self.shared.channels.write() = channels.clone();

        if !self.send_command(Command::SetChannels(channels)) {
            logger::debug(
                LogTag::Subscription,
                "Channels stored; will subscribe on next connect",
            );
        }
    }

    /// Ask the source to push fresh state; ignored unless connected
    pub fn refresh(&self) {
        if !self.send_command(Command::Refresh) {
            self.shared.metrics.inc_sends_dropped();
            logger::debug(LogTag::Transport, "Refresh ignored: client not running");
        }
    }

    /// Subscribe to classified events (live and synthetic), published after
    /// history and stats are updated
    pub fn on_event(&self) -> broadcast::Receiver<HistoryEntry> {
        self.shared.events_tx.subscribe()
    }

    pub fn on_state_change(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Retained events, newest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.history.read().entries()
    }

    pub fn stats(&self) -> AggregateStats {
        self.shared.stats.read().snapshot()
    }

    pub fn reset_stats(&self) {
        self.shared.stats.write().reset();
        logger::info(LogTag::Stats, "Stats reset");
    }

    /// Unexpired notifications, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        let now = Utc::now();
        let mut center = self.shared.notifications.write();
        center.prune(now);
        center.active(now)
    }

    pub fn dismiss_notification(&self, id: u64) -> bool {
        self.shared.notifications.write().remove(id)
    }

    pub fn clear_notifications(&self) {
        self.shared.notifications.write().clear();
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    pub fn channels(&self) -> ChannelSet {
        self.shared.channels.read().clone()
    }

    pub fn metrics(&self) -> StreamMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.driver
            .lock()
            .as_ref()
            .map(|d| !d.task.is_finished())
            .unwrap_or(false)
    }

    /// Tear everything down: timers, generator, transport; idempotent
    pub async fn disconnect(&self) {
        let driver = self.driver.lock().take();
        let Some(driver) = driver else {
            logger::debug(LogTag::System, "disconnect() ignored: not running");
            return;
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if driver
            .tx
            .send(DriverEvent::Command(Command::Shutdown(Some(ack_tx))))
            .is_ok()
        {
            let _ = ack_rx.await;
        }
        if let Err(e) = driver.task.await {
            if !e.is_cancelled() {
                logger::error(LogTag::System, &format!("Driver task failed: {}", e));
            }
        }

        // Normally published by the teardown transition; covers a driver that died early
        self.shared
            .state_tx
            .send_replace(ConnectionState::Disconnected);
        logger::info(LogTag::System, "Stream client disconnected");
    }

    fn send_command(&self, command: Command) -> bool {
        match self.driver.lock().as_ref() {
            Some(driver) => driver.tx.send(DriverEvent::Command(command)).is_ok(),
            None => false,
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            let _ = driver
                .tx
                .send(DriverEvent::Command(Command::Shutdown(None)));
        }
    }
}
