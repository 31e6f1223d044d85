// SPDX-License-Identifier: MIT

use crate::runtime::event::{EventSink, GameEvent};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Fan-out of game events to subscribed sinks.
///
/// Cloning shares the subscriber list. Sinks are called one after another in
/// subscription order; a publish works on a snapshot of the list, so a sink
/// removed mid-publish may still see that one event.
#[derive(Clone)]
pub struct EventBus {
    sinks: Arc<RwLock<Vec<(SubscriptionId, Arc<dyn EventSink>)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            sinks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn subscribe(&self, sink: Arc<dyn EventSink>) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        let mut sinks = self.sinks.write().await;
        log::debug!("Subscribed '{}' as {}", sink.name(), id);
        sinks.push((id, sink));
        id
    }

    /// Returns whether the subscription existed
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut sinks = self.sinks.write().await;
        let before = sinks.len();
        sinks.retain(|(existing, _)| *existing != id);
        let removed = sinks.len() != before;
        if removed {
            log::debug!("Unsubscribed {}", id);
        }
        removed
    }

    /// Deliver `event` to every current sink, returning how many were called
    pub async fn publish(&self, event: &GameEvent) -> usize {
        let snapshot: Vec<Arc<dyn EventSink>> = {
            let sinks = self.sinks.read().await;
            sinks.iter().map(|(_, sink)| Arc::clone(sink)).collect()
        };
        for sink in &snapshot {
            sink.deliver(event).await;
        }
        snapshot.len()
    }

    pub async fn len(&self) -> usize {
        self.sinks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sinks.read().await.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every event it sees, tagged with its own name
    struct RecordingSink {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSink {
        fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                log,
            }
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(&self, event: &GameEvent) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.name()));
        }
    }

    #[tokio::test]
    async fn test_publish_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Arc::new(RecordingSink::new("a", log.clone())))
            .await;
        bus.subscribe(Arc::new(RecordingSink::new("b", log.clone())))
            .await;

        assert_eq!(bus.publish(&GameEvent::Tick).await, 2);
        assert_eq!(*log.lock().unwrap(), vec!["a:tick", "b:tick"]);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = bus
            .subscribe(Arc::new(RecordingSink::new("a", log.clone())))
            .await;
        assert!(bus.unsubscribe(id).await);
        assert!(!bus.unsubscribe(id).await);
        assert!(bus.is_empty().await);
        assert_eq!(bus.publish(&GameEvent::Tick).await, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_subscribers() {
        let bus = EventBus::default();
        let other = bus.clone();
        let log = Arc::new(Mutex::new(Vec::new()));
        other
            .subscribe(Arc::new(RecordingSink::new("a", log.clone())))
            .await;
        assert_eq!(bus.len().await, 1);
    }
}
