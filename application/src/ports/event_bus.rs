//! Event Bus port
//!
//! Fans out ensemble run progress to subscribers (CLI progress display,
//! future UI front-ends). Bounded and lossy under backpressure: a slow
//! subscriber drops events rather than stalling the coordinator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnsembleEvent {
    StageStarted {
        session_name: String,
        stage: String,
        at: DateTime<Utc>,
    },
    AssignmentStatusChanged {
        session_name: String,
        mode_id: String,
        status: String,
        at: DateTime<Utc>,
    },
    SynthesisChunk {
        session_name: String,
        index: u32,
        payload: String,
    },
    RunFailed {
        session_name: String,
        reason: String,
        at: DateTime<Utc>,
    },
}

#[async_trait]
pub trait EventBus: Send + Sync {
    fn publish(&self, event: EnsembleEvent);

    fn subscribe(&self) -> broadcast::Receiver<EnsembleEvent>;
}
