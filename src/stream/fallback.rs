/// Synthetic fallback generator
///
/// Emits one plausible frame per interval, drawn from a small fixed
/// catalogue, in exactly the wire shape the live source uses. Frames go
/// through the normal classifier path, so downstream consumers cannot tell
/// synthetic data from live data except through `ConnectionState`.
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::logger::{self, LogTag};

pub const DEFAULT_FALLBACK_INTERVAL: Duration = Duration::from_secs(5);

/// The catalogue of representative frames, one per channel
pub fn catalogue() -> Vec<Value> {
    let order_id = format!("ORD-{}", rand::thread_rng().gen_range(0..10_000));
    vec![
        json!({
            "type": "inventory",
            "level": "info",
            "message": "Stock level updated for Organic Bananas",
            "data": { "item": "Organic Bananas", "old_stock": 45, "new_stock": 42 }
        }),
        json!({
            "type": "orders",
            "level": "success",
            "message": "New order received from John Smith",
            "data": { "order_id": order_id, "customer": "John Smith" }
        }),
        json!({
            "type": "deliveries",
            "level": "info",
            "message": "Delivery DEL-1234 is now in transit",
            "data": { "delivery_id": "DEL-1234", "status": "IN_TRANSIT" }
        }),
    ]
}

/// One random catalogue entry, stamped with the current time, as a raw frame
pub fn synthetic_frame() -> String {
    let mut entries = catalogue();
    let index = rand::thread_rng().gen_range(0..entries.len());
    let mut frame = entries.swap_remove(index);
    if let Some(object) = frame.as_object_mut() {
        object.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    frame.to_string()
}

/// Ticker handle; at most one emission task runs per generator
#[derive(Debug)]
pub struct SyntheticGenerator {
    interval: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl SyntheticGenerator {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            generation: 0,
            task: None,
        }
    }

    /// Start ticking; `emit(generation, raw)` returns false once nobody listens.
    ///
    /// Returns false (and does nothing) when already running.
    pub fn start<F>(&mut self, emit: F) -> bool
    where
        F: Fn(u64, String) -> bool + Send + 'static,
    {
        if self.task.is_some() {
            return false;
        }

        self.generation += 1;
        let generation = self.generation;
        let period = self.interval;

        logger::info(
            LogTag::Fallback,
            &format!(
                "Synthetic generator started (every {} ms)",
                period.as_millis()
            ),
        );

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !emit(generation, synthetic_frame()) {
                    break;
                }
            }
        }));

        true
    }

    /// Stop ticking; returns whether a task was running
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.abort();
        // Ticks already queued under the old generation become stale
        self.generation += 1;
        logger::info(LogTag::Fallback, "Synthetic generator stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }
}

impl Drop for SyntheticGenerator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::classifier::classify;
    use tokio::sync::mpsc;

    #[test]
    fn test_catalogue_frames_classify() {
        for _ in 0..20 {
            let raw = synthetic_frame();
            let event = classify(&raw, Utc::now()).unwrap();
            assert!(["inventory", "orders", "deliveries"].contains(&event.channel.as_str()));
            assert!(!event.message.is_empty());
            assert!(event.payload.is_some());
        }

        let order = &catalogue()[1];
        assert!(order["data"]["order_id"].as_str().unwrap().starts_with("ORD-"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_once_per_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut generator = SyntheticGenerator::new(Duration::from_secs(5));
        assert!(generator.start(move |generation, raw| tx.send((generation, raw)).is_ok()));
        assert!(generator.is_running());

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let (generation, raw) = rx.try_recv().unwrap();
        assert!(generator.is_current(generation));
        assert!(classify(&raw, Utc::now()).is_ok());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_instance_and_stop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut generator = SyntheticGenerator::new(Duration::from_secs(1));

        let first = tx.clone();
        assert!(generator.start(move |generation, raw| first.send((generation, raw)).is_ok()));
        let second = tx.clone();
        assert!(!generator.start(move |generation, raw| second.send((generation, raw)).is_ok()));

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let (old_generation, _) = rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err());

        assert!(generator.stop());
        assert!(!generator.stop());
        assert!(!generator.is_current(old_generation));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
