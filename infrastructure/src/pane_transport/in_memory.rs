//! In-memory Pane Transport
//!
//! Test double and `DryRun` backend: panes are plain strings in a shared
//! map, no process is spawned. Mirrors the `MockProvider` pattern used to
//! exercise routing logic without a live gateway.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ensemble_application::ports::pane_transport::{PaneTransport, PaneTransportError};
use ensemble_domain::pane::Pane;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryPaneTransport {
    panes: Vec<Pane>,
    captures: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryPaneTransport {
    pub fn new(panes: Vec<Pane>) -> Self {
        Self { panes, captures: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Pre-seed what the next `capture` call for `pane_name` will return,
    /// simulating an agent having written its output into the pane.
    pub async fn seed_capture(&self, pane_name: &str, text: impl Into<String>) {
        self.captures.lock().await.insert(pane_name.to_string(), text.into());
    }
}

#[async_trait]
impl PaneTransport for InMemoryPaneTransport {
    async fn send(&self, pane_name: &str, text: &str) -> Result<(), PaneTransportError> {
        if !self.panes.iter().any(|p| p.title == pane_name) {
            return Err(PaneTransportError::NotFound(pane_name.to_string()));
        }
        self.captures.lock().await.entry(pane_name.to_string()).or_insert_with(|| text.to_string());
        Ok(())
    }

    async fn capture(&self, pane_name: &str) -> Result<String, PaneTransportError> {
        Ok(self.captures.lock().await.get(pane_name).cloned().unwrap_or_default())
    }

    async fn list_panes(&self) -> Result<Vec<Pane>, PaneTransportError> {
        Ok(self.panes.clone())
    }
}
