//! Event Bus adapter backed by `tokio::sync::broadcast`.
//!
//! Bounded and lossy by design: a subscriber that falls behind sees
//! `broadcast::error::RecvError::Lagged` and skips forward rather than
//! stalling publication for everyone else.

use async_trait::async_trait;
use ensemble_application::ports::event_bus::{EnsembleEvent, EventBus};
use tokio::sync::broadcast;

pub struct BroadcastEventBus {
    sender: broadcast::Sender<EnsembleEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventBus for BroadcastEventBus {
    fn publish(&self, event: EnsembleEvent) {
        // No subscribers is not an error: a send with zero receivers
        // simply has nothing to deliver to.
        let _ = self.sender.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<EnsembleEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = BroadcastEventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(EnsembleEvent::StageStarted {
            session_name: "s1".into(),
            stage: "intake".into(),
            at: Utc::now(),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, EnsembleEvent::StageStarted { .. }));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let bus = BroadcastEventBus::new(16);
        bus.publish(EnsembleEvent::RunFailed { session_name: "s1".into(), reason: "x".into(), at: Utc::now() });
    }
}
