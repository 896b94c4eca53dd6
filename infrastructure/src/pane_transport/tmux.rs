//! `tmux`-backed Pane Transport
//!
//! Shells out to `tmux send-keys` / `tmux capture-pane` / `tmux
//! list-panes`, the concrete terminal multiplexer named in this
//! project's glossary.

use async_trait::async_trait;
use ensemble_application::ports::pane_transport::{PaneTransport, PaneTransportError};
use ensemble_domain::pane::{AgentKind, Pane};
use tokio::process::Command;

pub struct TmuxPaneTransport {
    session: String,
}

impl TmuxPaneTransport {
    pub fn new(session: impl Into<String>) -> Self {
        Self { session: session.into() }
    }

    fn target(&self, pane_name: &str) -> String {
        format!("{}:{}", self.session, pane_name)
    }
}

#[async_trait]
impl PaneTransport for TmuxPaneTransport {
    async fn send(&self, pane_name: &str, text: &str) -> Result<(), PaneTransportError> {
        let status = Command::new("tmux")
            .args(["send-keys", "-t", &self.target(pane_name), text, "Enter"])
            .status()
            .await
            .map_err(|e| PaneTransportError::WriteFailed(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(PaneTransportError::WriteFailed(format!("tmux send-keys exited with {status}")))
        }
    }

    async fn capture(&self, pane_name: &str) -> Result<String, PaneTransportError> {
        let output = Command::new("tmux")
            .args(["capture-pane", "-p", "-t", &self.target(pane_name)])
            .output()
            .await
            .map_err(|e| PaneTransportError::CaptureFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(PaneTransportError::CaptureFailed(format!(
                "tmux capture-pane exited with {}",
                output.status
            )));
        }
        String::from_utf8(output.stdout).map_err(|e| PaneTransportError::CaptureFailed(e.to_string()))
    }

    async fn list_panes(&self) -> Result<Vec<Pane>, PaneTransportError> {
        let output = Command::new("tmux")
            .args(["list-panes", "-t", &self.session, "-F", "#{pane_title}\t#{pane_index}"])
            .output()
            .await
            .map_err(|e| PaneTransportError::CaptureFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(PaneTransportError::CaptureFailed(format!(
                "tmux list-panes exited with {}",
                output.status
            )));
        }
        let text = String::from_utf8(output.stdout).map_err(|e| PaneTransportError::CaptureFailed(e.to_string()))?;
        let panes = text
            .lines()
            .filter_map(|line| {
                let (title, idx) = line.split_once('\t')?;
                Some(Pane {
                    title: title.to_string(),
                    agent_type: AgentKind::Generic,
                    stable_index: idx.parse().ok()?,
                })
            })
            .collect();
        Ok(panes)
    }
}
