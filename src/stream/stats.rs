/// Incremental per-channel counters derived from classified events
///
/// The order and delivery counters rely on keyword matches in the message
/// text. Messages are lowercased and underscores become spaces before
/// matching, so `IN_TRANSIT` and `In Transit` both count.
use serde::Serialize;

use super::types::{channels, InboundEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InventoryStats {
    pub active: u64,
    pub alerts: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    pub processing: u64,
    pub shipped: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    pub in_transit: u64,
    pub delayed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub inventory: InventoryStats,
    pub orders: OrderStats,
    pub deliveries: DeliveryStats,
}

#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    stats: AggregateStats,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the classification rules for one event; returns whether any counter moved
    pub fn record(&mut self, event: &InboundEvent) -> bool {
        let text = normalize_message(&event.message);

        match event.channel.as_str() {
            channels::INVENTORY => {
                self.stats.inventory.active += 1;
                if event.level.is_alert() {
                    self.stats.inventory.alerts += 1;
                }
                true
            }
            channels::ORDERS => {
                if text.contains("processing") {
                    self.stats.orders.processing += 1;
                    true
                } else if text.contains("shipped") {
                    self.stats.orders.shipped += 1;
                    true
                } else {
                    false
                }
            }
            channels::DELIVERIES => {
                if text.contains("in transit") {
                    self.stats.deliveries.in_transit += 1;
                    true
                } else if text.contains("delayed") {
                    self.stats.deliveries.delayed += 1;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> AggregateStats {
        self.stats
    }

    /// Explicit full reset; never part of the normal event flow
    pub fn reset(&mut self) {
        self.stats = AggregateStats::default();
    }
}

fn normalize_message(message: &str) -> String {
    message.to_lowercase().replace('_', " ")
}
