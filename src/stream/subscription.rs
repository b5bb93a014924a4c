use super::message::ClientMessage;
use super::transport::FrameSender;
use super::types::ChannelSet;
use crate::errors::StreamError;
use crate::logger::{self, LogTag};

/// Desired channel set, kept independently of any single connection
///
/// The set survives reconnects and is re-sent in full after every successful
/// connect. A change made while no transport is open is stored and goes out
/// with the next connect.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionManager {
    desired: ChannelSet,
}

impl SubscriptionManager {
    pub fn new(initial: ChannelSet) -> Self {
        Self { desired: initial }
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.desired
    }

    /// Replace the desired set and push it to the source if a transport is open
    ///
    /// The set is stored either way. `Err(SubscriptionSend)` only means the
    /// frame was deferred to the next connect.
    pub fn set_channels(
        &mut self,
        channels: ChannelSet,
        sender: Option<&dyn FrameSender>,
    ) -> Result<(), StreamError> {
        self.desired = channels;

        logger::debug(
            LogTag::Subscription,
            &format!("Desired channels: {}", self.describe()),
        );

        match sender {
            Some(sender) if sender.is_open() => self.send_subscribe(sender),
            _ => Err(StreamError::SubscriptionSend {
                reason: "no open transport, deferred until connect".to_string(),
            }),
        }
    }

    /// Re-send the full desired set on a freshly opened transport
    pub fn on_connected(&self, sender: &dyn FrameSender) -> Result<(), StreamError> {
        logger::debug(
            LogTag::Subscription,
            &format!("Resubscribing after connect: {}", self.describe()),
        );
        self.send_subscribe(sender)
    }

    fn send_subscribe(&self, sender: &dyn FrameSender) -> Result<(), StreamError> {
        let json = ClientMessage::subscribe(&self.desired).to_json()?;
        if sender.send(&json) {
            Ok(())
        } else {
            Err(StreamError::SubscriptionSend {
                reason: "transport rejected the frame".to_string(),
            })
        }
    }

    fn describe(&self) -> String {
        if self.desired.is_empty() {
            "(none)".to_string()
        } else {
            self.desired.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}
