//! Merge configuration, the merged result shapes, and the disagreement
//! audit report Stage 3 produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::mode_output::Impact;

/// The closed set of synthesis strategies. `Manual` performs the mechanical
/// merge and returns; the other three additionally generate a synthesizer
/// prompt for an external agent, falling back to the mechanical merge when
/// no external agent is available (Design Note: "a failure of the agent
/// step must never regress the deterministic result").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStrategy {
    #[default]
    Manual,
    Consensus,
    Weighted,
    Dialectical,
}

impl SynthesisStrategy {
    pub fn name(self) -> &'static str {
        match self {
            SynthesisStrategy::Manual => "manual",
            SynthesisStrategy::Consensus => "consensus",
            SynthesisStrategy::Weighted => "weighted",
            SynthesisStrategy::Dialectical => "dialectical",
        }
    }

    /// Whether this strategy wants a synthesizer prompt generated in
    /// addition to the mechanical merge.
    pub fn wants_agent_prompt(self) -> bool {
        !matches!(self, SynthesisStrategy::Manual)
    }
}

impl std::str::FromStr for SynthesisStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(SynthesisStrategy::Manual),
            "consensus" => Ok(SynthesisStrategy::Consensus),
            "weighted" => Ok(SynthesisStrategy::Weighted),
            "dialectical" => Ok(SynthesisStrategy::Dialectical),
            other => Err(format!("unknown synthesis strategy: {other}")),
        }
    }
}

impl std::fmt::Display for SynthesisStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parameters controlling the deterministic merge (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub strategy: SynthesisStrategy,
    /// 0 means "unlimited" (spec.md §8 boundary case).
    pub max_findings: usize,
    pub max_risks: usize,
    pub max_recommendations: usize,
    pub min_confidence: f64,
    pub dedup_threshold: f64,
    pub weight_by_confidence: bool,
    pub prefer_high_impact: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            strategy: SynthesisStrategy::Manual,
            max_findings: 10,
            max_risks: 10,
            max_recommendations: 10,
            min_confidence: 0.0,
            dedup_threshold: 0.7,
            weight_by_confidence: true,
            prefer_high_impact: true,
        }
    }
}

/// A merged entry that survived deduplication, with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEntry {
    pub text: String,
    pub impact: Option<Impact>,
    pub source_modes: BTreeSet<String>,
    pub merge_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub summary: String,
    pub findings: Vec<MergedEntry>,
    pub risks: Vec<MergedEntry>,
    pub recommendations: Vec<MergedEntry>,
    pub questions_for_user: Vec<String>,
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictPosition {
    pub mode_id: String,
    pub position_text: String,
    pub evidence: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedConflict {
    pub topic: String,
    pub positions: Vec<ConflictPosition>,
    pub severity: Severity,
    pub resolution_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuditReport {
    pub conflicts: Vec<DetailedConflict>,
    pub mode_disagreements: std::collections::HashMap<String, Vec<String>>,
    pub resolution_suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_from_str() {
        assert_eq!("weighted".parse::<SynthesisStrategy>().unwrap(), SynthesisStrategy::Weighted);
        assert!("bogus".parse::<SynthesisStrategy>().is_err());
    }

    #[test]
    fn only_manual_skips_agent_prompt() {
        assert!(!SynthesisStrategy::Manual.wants_agent_prompt());
        assert!(SynthesisStrategy::Consensus.wants_agent_prompt());
        assert!(SynthesisStrategy::Weighted.wants_agent_prompt());
        assert!(SynthesisStrategy::Dialectical.wants_agent_prompt());
    }
}
