//! Domain-wide error type for the ensemble pipeline.
//!
//! Variant names track the stable error labels from the pipeline's error
//! handling design one-for-one, so adapters and tests can match on them
//! without string comparison.

use thiserror::Error;

/// Suggestions offered alongside a "not found" error (closest matches by
/// edit distance).
pub type Suggestions = Vec<String>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("mode not found: {0}")]
    ModeNotFound(String, #[source] ModeNotFoundHint),

    #[error("mode code invalid: {0}")]
    ModeCodeInvalid(String, #[source] ModeNotFoundHint),

    #[error("preset not found: {0}")]
    PresetNotFound(String, #[source] ModeNotFoundHint),

    #[error("preset extension cycle detected starting at {0}")]
    ExtendsCycle(String),

    #[error("preset extension depth exceeded for {preset} (max {max})")]
    ExtendsDepth { preset: String, max: usize },

    #[error("not enough panes for {needed} modes ({available} available)")]
    AssignmentPaneShortage { needed: usize, available: usize },

    #[error("no pane of agent type {agent_type} available for mode {mode_id}")]
    AssignmentAgentMismatch { mode_id: String, agent_type: String },

    #[error("pane {0} assigned to more than one mode")]
    AssignmentDuplicatePane(String),

    #[error("budget invalid: {0}")]
    BudgetInvalid(String),

    #[error("pane write failed: {0}")]
    PaneWriteFailed(String),

    #[error("pane capture failed: {0}")]
    PaneCaptureFailed(String),

    #[error("output parse failed for mode {mode_id}: {reason}")]
    OutputParseFailed { mode_id: String, reason: String },

    #[error("output validation failed for mode {mode_id}: {reasons:?}")]
    OutputValidationFailed {
        mode_id: String,
        reasons: Vec<String>,
    },

    #[error("agent budget exceeded for mode {0}")]
    AgentBudgetExceeded(String),

    #[error("total budget exceeded")]
    TotalBudgetExceeded,

    #[error("timebox reached")]
    TimeboxReached,

    #[error("canceled")]
    Canceled,

    #[error("synthesis insufficient outputs: have {have}, need {need}")]
    SynthesisInsufficientOutputs { have: usize, need: usize },

    #[error("state store unavailable: {0}")]
    StateStoreUnavailable(String),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("context generation failed: {0}")]
    ContextGenFailed(String),
}

impl DomainError {
    /// Whether this error represents a cancellation (always wins over other
    /// errors per the propagation rules).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Canceled)
    }

    pub fn mode_not_found(id: impl Into<String>, suggestions: Suggestions) -> Self {
        DomainError::ModeNotFound(id.into(), ModeNotFoundHint(suggestions))
    }

    pub fn mode_code_invalid(code: impl Into<String>, suggestions: Suggestions) -> Self {
        DomainError::ModeCodeInvalid(code.into(), ModeNotFoundHint(suggestions))
    }

    pub fn preset_not_found(name: impl Into<String>, suggestions: Suggestions) -> Self {
        DomainError::PresetNotFound(name.into(), ModeNotFoundHint(suggestions))
    }

    /// Suggestions attached to a not-found style error, if any.
    pub fn suggestions(&self) -> &[String] {
        match self {
            DomainError::ModeNotFound(_, hint)
            | DomainError::ModeCodeInvalid(_, hint)
            | DomainError::PresetNotFound(_, hint) => &hint.0,
            _ => &[],
        }
    }
}

/// Carries the suggestion list for a not-found error without cluttering the
/// `Display` impl (shown via `#[source]` instead).
#[derive(Debug, Default)]
pub struct ModeNotFoundHint(pub Suggestions);

impl std::fmt::Display for ModeNotFoundHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "no suggestions")
        } else {
            write!(f, "did you mean: {}?", self.0.join(", "))
        }
    }
}

impl std::error::Error for ModeNotFoundHint {}
