//! The structured output produced by one reasoning mode, and its validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed impact scale used by findings, risks and recommendation
/// priorities. Ordering is significant: `impact_weight` must be strictly
/// decreasing from `Critical` to `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Impact {
    /// Weight used by the merger's scoring formulas. `unknown` values that
    /// fail to parse fall back to 0.4, between `Low` and `Medium`.
    pub fn weight(self) -> f64 {
        match self {
            Impact::Critical => 1.0,
            Impact::High => 0.8,
            Impact::Medium => 0.5,
            Impact::Low => 0.3,
        }
    }

    pub const UNKNOWN_WEIGHT: f64 = 0.4;
}

impl std::str::FromStr for Impact {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Impact::Critical),
            "high" => Ok(Impact::High),
            "medium" => Ok(Impact::Medium),
            "low" => Ok(Impact::Low),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub text: String,
    pub confidence: f64,
    pub impact: Option<Impact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub text: String,
    pub likelihood: f64,
    pub impact: Impact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub text: String,
    pub priority: Impact,
}

/// The parsed, not-yet-validated structured output of one reasoning mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeOutput {
    pub mode_id: String,
    pub thesis: String,
    pub top_findings: Vec<Finding>,
    pub risks: Vec<Risk>,
    pub recommendations: Vec<Recommendation>,
    pub questions_for_user: Vec<String>,
    pub confidence: f64,
    pub raw_output: String,
    pub generated_at: DateTime<Utc>,
}

/// Validate and normalize a candidate `ModeOutput` in place, applying the
/// defaulting rules from the data model (`confidence` defaults to 0.5 when
/// zero/missing, likewise for finding/risk confidence and likelihood).
///
/// Returns the list of validation errors; an empty list means the output is
/// accepted as-is.
pub fn validate_and_normalize(output: &mut ModeOutput) -> Vec<String> {
    let mut errors = Vec::new();

    if output.mode_id.trim().is_empty() {
        errors.push("mode_id must not be empty".to_string());
    }
    if output.thesis.trim().is_empty() {
        errors.push("thesis must not be empty".to_string());
    }
    if output.top_findings.is_empty() {
        errors.push("top_findings must not be empty".to_string());
    }

    if output.confidence == 0.0 {
        output.confidence = 0.5;
    }
    if !(0.0..=1.0).contains(&output.confidence) {
        errors.push(format!("confidence {} out of range [0,1]", output.confidence));
    }

    for finding in &mut output.top_findings {
        if finding.text.trim().is_empty() {
            errors.push("finding text must not be empty".to_string());
        }
        if finding.confidence == 0.0 {
            finding.confidence = 0.5;
        }
        if !(0.0..=1.0).contains(&finding.confidence) {
            errors.push(format!(
                "finding confidence {} out of range [0,1]",
                finding.confidence
            ));
        }
    }

    for risk in &mut output.risks {
        if risk.likelihood == 0.0 {
            risk.likelihood = 0.5;
        }
        if !(0.0..=1.0).contains(&risk.likelihood) {
            errors.push(format!(
                "risk likelihood {} out of range [0,1]",
                risk.likelihood
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModeOutput {
        ModeOutput {
            mode_id: "A1".into(),
            thesis: "X is the cause".into(),
            top_findings: vec![Finding {
                text: "evidence A".into(),
                confidence: 0.0,
                impact: None,
            }],
            risks: vec![Risk {
                text: "risk A".into(),
                likelihood: 0.0,
                impact: Impact::Medium,
            }],
            recommendations: vec![],
            questions_for_user: vec![],
            confidence: 0.0,
            raw_output: "raw".into(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn zero_confidence_defaults_to_half() {
        let mut out = sample();
        let errors = validate_and_normalize(&mut out);
        assert!(errors.is_empty());
        assert_eq!(out.confidence, 0.5);
        assert_eq!(out.top_findings[0].confidence, 0.5);
        assert_eq!(out.risks[0].likelihood, 0.5);
    }

    #[test]
    fn empty_findings_rejected() {
        let mut out = sample();
        out.top_findings.clear();
        let errors = validate_and_normalize(&mut out);
        assert!(errors.iter().any(|e| e.contains("top_findings")));
    }

    #[test]
    fn impact_weights_strictly_decrease() {
        assert!(Impact::Critical.weight() > Impact::High.weight());
        assert!(Impact::High.weight() > Impact::Medium.weight());
        assert!(Impact::Medium.weight() > Impact::Low.weight());
    }
}
