//! Per-job progress fan-out.
//!
//! One channel per job id, multiplexing progress events to any number of
//! live subscribers. Registration and deregistration go through a
//! concurrent map keyed by job id; the snapshot taken for a publish is read
//! out from under that key's shard, and sends happen outside any lock so a
//! slow subscriber never blocks the publisher. Any subscriber whose send
//! fails is evicted afterward rather than retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;

/// A live handle attached to the hub under some channel key.
#[derive(Clone)]
pub struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<String>,
}

impl Subscriber {
    fn send(&self, payload: &str) -> bool {
        self.tx.send(payload.to_string()).is_ok()
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Subscriber {}

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// The progress fan-out hub. Cheap to clone; internal state is `Arc`-shared.
#[derive(Clone, Default)]
pub struct ProgressHub {
    channels: Arc<DashMap<String, Vec<Subscriber>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber under `key` and returns a receiver that
    /// yields every payload subsequently published to that key, in publish
    /// order.
    pub async fn connect(&self, key: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber {
            id: NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed),
            tx,
        };
        self.channels.entry(key.to_string()).or_default().push(subscriber);
        rx
    }

    /// Publishes a JSON-serializable payload to every subscriber currently
    /// registered under `key`. Snapshots the subscriber list, sends outside
    /// the snapshot, then evicts any subscriber whose send failed.
    pub async fn publish<T: Serialize>(&self, key: &str, payload: &T) {
        let body = match serde_json::to_string(payload) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("progress hub: failed to serialize event for {}: {}", key, e);
                return;
            }
        };

        let snapshot = match self.channels.get(key) {
            Some(subs) => subs.clone(),
            None => return,
        };

        let mut stale = Vec::new();
        for sub in &snapshot {
            if !sub.send(&body) {
                stale.push(sub.id);
            }
        }

        if !stale.is_empty() {
            if let Some(mut subs) = self.channels.get_mut(key) {
                subs.retain(|s| !stale.contains(&s.id));
                if subs.is_empty() {
                    drop(subs);
                    self.channels.remove(key);
                }
            }
        }
    }

    /// Number of live subscribers currently registered under `key`.
    pub async fn subscriber_count(&self, key: &str) -> usize {
        self.channels.get(key).map_or(0, |subs| subs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publish_delivers_in_order_to_one_subscriber() {
        let hub = ProgressHub::new();
        let mut rx = hub.connect("job-1").await;

        hub.publish("job-1", &json!({"status": "started"})).await;
        hub.publish("job-1", &json!({"status": "running"})).await;

        assert!(rx.recv().await.unwrap().contains("started"));
        assert!(rx.recv().await.unwrap().contains("running"));
    }

    #[tokio::test]
    async fn publish_fans_out_to_multiple_subscribers() {
        let hub = ProgressHub::new();
        let mut a = hub.connect("job-1").await;
        let mut b = hub.connect("job-1").await;

        hub.publish("job-1", &json!({"status": "running"})).await;

        assert!(a.recv().await.unwrap().contains("running"));
        assert!(b.recv().await.unwrap().contains("running"));
    }

    #[tokio::test]
    async fn dropped_subscriber_is_evicted_on_next_publish() {
        let hub = ProgressHub::new();
        let rx = hub.connect("job-1").await;
        drop(rx);

        hub.publish("job-1", &json!({"status": "running"})).await;
        assert_eq!(hub.subscriber_count("job-1").await, 0);
    }

    #[tokio::test]
    async fn unknown_channel_publish_is_a_no_op() {
        let hub = ProgressHub::new();
        hub.publish("nobody-home", &json!({"status": "running"})).await;
    }

    #[tokio::test]
    async fn channels_are_independent() {
        let hub = ProgressHub::new();
        let mut a = hub.connect("job-a").await;
        let _b = hub.connect("job-b").await;

        hub.publish("job-a", &json!({"status": "running"})).await;
        assert!(a.recv().await.unwrap().contains("running"));
        assert_eq!(hub.subscriber_count("job-b").await, 1);
    }
}
