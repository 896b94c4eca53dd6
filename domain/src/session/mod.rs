//! `ModeAssignment` and `EnsembleSession`: the mutable state the Mode Run
//! Coordinator drives from `pending` to a terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pane::AgentKind;
use crate::synthesis::SynthesisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Active,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeAssignment {
    pub mode_id: String,
    pub pane_name: String,
    pub agent_type: AgentKind,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output_path: Option<String>,
    pub error: Option<String>,
}

impl ModeAssignment {
    pub fn new(mode_id: impl Into<String>, pane_name: impl Into<String>, agent_type: AgentKind) -> Self {
        Self {
            mode_id: mode_id.into(),
            pane_name: pane_name.into(),
            agent_type,
            status: AssignmentStatus::Pending,
            assigned_at: Utc::now(),
            completed_at: None,
            output_path: None,
            error: None,
        }
    }

    pub fn mark_active(&mut self) {
        self.status = AssignmentStatus::Active;
    }

    pub fn mark_done(&mut self, output_path: Option<String>) {
        self.status = AssignmentStatus::Done;
        self.completed_at = Some(Utc::now());
        self.output_path = output_path;
    }

    pub fn mark_error(&mut self, reason: impl Into<String>) {
        self.status = AssignmentStatus::Error;
        self.completed_at = Some(Utc::now());
        self.error = Some(reason.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Complete,
    Failed,
}

/// The furthest stage an ensemble run reached. `Success()` in the original
/// interface contract corresponds to `stage == Complete && error.is_none()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Intake,
    ModeRun,
    Synthesis,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleSession {
    pub session_name: String,
    pub question: String,
    pub preset_used: Option<String>,
    pub status: SessionStatus,
    pub synthesis_strategy: String,
    pub created_at: DateTime<Utc>,
    pub synthesized_at: Option<DateTime<Utc>>,
    pub synthesis_output: Option<SynthesisResult>,
    pub error: Option<String>,
    pub assignments: Vec<ModeAssignment>,
}

impl EnsembleSession {
    pub fn new(session_name: impl Into<String>, question: impl Into<String>, synthesis_strategy: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            question: question.into(),
            preset_used: None,
            status: SessionStatus::Active,
            synthesis_strategy: synthesis_strategy.into(),
            created_at: Utc::now(),
            synthesized_at: None,
            synthesis_output: None,
            error: None,
            assignments: Vec::new(),
        }
    }

    pub fn assignment_mut(&mut self, mode_id: &str) -> Option<&mut ModeAssignment> {
        self.assignments.iter_mut().find(|a| a.mode_id == mode_id)
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = SessionStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn mark_complete(&mut self, result: SynthesisResult) {
        self.status = SessionStatus::Complete;
        self.synthesized_at = Some(Utc::now());
        self.synthesis_output = Some(result);
    }
}
