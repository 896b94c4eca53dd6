//! Pane descriptors — an addressable terminal region owned by an external
//! agent process.

use serde::{Deserialize, Serialize};

/// Closed set of external agent kinds a pane may be running.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    ClaudeCode,
    Codex,
    Gemini,
    Aider,
    Generic,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentKind::ClaudeCode => "claude-code",
            AgentKind::Codex => "codex",
            AgentKind::Gemini => "gemini",
            AgentKind::Aider => "aider",
            AgentKind::Generic => "generic",
        };
        write!(f, "{s}")
    }
}

/// A pane available for assignment, as reported by the Pane Transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pane {
    pub title: String,
    pub agent_type: AgentKind,
    pub stable_index: u32,
}
