//! Output Collector & Validator
//!
//! Extracts a structured `ModeOutput` from the free-form text an agent
//! pane produces, then validates and normalizes it. Parsing is lenient:
//! it scans for the last well-formed fenced JSON block rather than
//! requiring the whole capture to be JSON, the same "prefer a valid
//! block over the last block" strategy the vote parser uses.

use chrono::Utc;
use ensemble_domain::mode_output::{validate_and_normalize, ModeOutput};
use serde::Deserialize;

/// Shape of the fenced block an agent pane is expected to emit. Mirrors
/// `ModeOutput` minus the fields the collector fills in itself
/// (`mode_id`, `raw_output`, `generated_at`).
#[derive(Debug, Deserialize)]
struct RawModeOutput {
    thesis: String,
    #[serde(default)]
    top_findings: Vec<ensemble_domain::mode_output::Finding>,
    #[serde(default)]
    risks: Vec<ensemble_domain::mode_output::Risk>,
    #[serde(default)]
    recommendations: Vec<ensemble_domain::mode_output::Recommendation>,
    #[serde(default)]
    questions_for_user: Vec<String>,
    #[serde(default)]
    confidence: f64,
}

/// Find every `{ ... }` span in `text` and return the last one that parses
/// as a `RawModeOutput`. Returns `None` if no span parses.
fn find_last_valid_json_block(text: &str) -> Option<RawModeOutput> {
    let bytes = text.as_bytes();
    let mut starts = Vec::new();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'{' {
            starts.push(i);
        }
    }

    let mut best = None;
    for start in starts {
        let Some(rel_end) = text[start..].rfind('}') else {
            continue;
        };
        let candidate = &text[start..start + rel_end + 1];
        if let Ok(parsed) = serde_json::from_str::<RawModeOutput>(candidate) {
            best = Some(parsed);
        }
    }
    best
}

/// Extract and validate a `ModeOutput` from a pane's captured text.
///
/// Returns `(output, errors)` rather than failing outright: a non-empty
/// `errors` list means the output was rejected and the caller should
/// record `OutputValidationFailed`, but the (possibly unusable)
/// best-effort output is still returned for diagnostics.
pub fn parse_mode_output(mode_id: &str, raw_output: &str) -> (ModeOutput, Vec<String>) {
    let Some(raw) = find_last_valid_json_block(raw_output) else {
        return (
            ModeOutput {
                mode_id: mode_id.to_string(),
                thesis: String::new(),
                top_findings: Vec::new(),
                risks: Vec::new(),
                recommendations: Vec::new(),
                questions_for_user: Vec::new(),
                confidence: 0.0,
                raw_output: raw_output.to_string(),
                generated_at: Utc::now(),
            },
            vec!["no parseable output block found".to_string()],
        );
    };

    let mut output = ModeOutput {
        mode_id: mode_id.to_string(),
        thesis: raw.thesis,
        top_findings: raw.top_findings,
        risks: raw.risks,
        recommendations: raw.recommendations,
        questions_for_user: raw.questions_for_user,
        confidence: raw.confidence,
        raw_output: raw_output.to_string(),
        generated_at: Utc::now(),
    };

    let errors = validate_and_normalize(&mut output);
    (output, errors)
}
