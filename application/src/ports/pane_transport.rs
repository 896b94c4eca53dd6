//! Pane Transport port
//!
//! Defines how the coordinator addresses a terminal pane owned by an
//! external agent process: writing a prompt into it and reading back
//! whatever text has accumulated.

use async_trait::async_trait;
use ensemble_domain::pane::Pane;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaneTransportError {
    #[error("pane write failed: {0}")]
    WriteFailed(String),

    #[error("pane capture failed: {0}")]
    CaptureFailed(String),

    #[error("pane not found: {0}")]
    NotFound(String),
}

/// Transport for sending prompts to, and capturing output from, external
/// agent panes. Implementations live in the infrastructure layer.
#[async_trait]
pub trait PaneTransport: Send + Sync {
    /// Write `text` into the pane identified by `pane_name`, as if typed
    /// followed by Enter.
    async fn send(&self, pane_name: &str, text: &str) -> Result<(), PaneTransportError>;

    /// Capture the current visible+scrollback text of the pane.
    async fn capture(&self, pane_name: &str) -> Result<String, PaneTransportError>;

    /// List the panes currently available for assignment.
    async fn list_panes(&self) -> Result<Vec<Pane>, PaneTransportError>;
}
