//! Merger, Auditor, Synthesizer
//!
//! Deterministically merges the `ModeOutput`s collected from a run into a
//! single `SynthesisResult`, flags divergent positions as an
//! `AuditReport`, and (for non-`manual` strategies) produces the prompt an
//! external synthesizer agent would complete — a failure of that external
//! step never regresses the deterministic merge already computed.

use std::collections::BTreeSet;

use ensemble_domain::core::error::DomainError;
use ensemble_domain::core::text::jaccard_text;
use ensemble_domain::mode_output::{Impact, ModeOutput};
use ensemble_domain::synthesis::{
    AuditReport, ConflictPosition, DetailedConflict, MergeConfig, MergedEntry, Severity,
    SynthesisResult,
};
use chrono::Utc;

struct Candidate {
    text: String,
    impact: Option<Impact>,
    confidence: f64,
    mode_id: String,
}

fn weight(candidate: &Candidate, config: &MergeConfig) -> f64 {
    let impact_weight = candidate.impact.map(Impact::weight).unwrap_or(Impact::UNKNOWN_WEIGHT);
    if config.weight_by_confidence {
        impact_weight * candidate.confidence
    } else {
        impact_weight
    }
}

/// Deduplicate `candidates` by Jaccard similarity over their normalized
/// text, merging members of a cluster into one `MergedEntry` whose
/// `merge_score` is the cluster's highest weight and whose `source_modes`
/// records every contributing mode.
fn dedup_and_merge(candidates: Vec<Candidate>, config: &MergeConfig) -> Vec<MergedEntry> {
    let mut clusters: Vec<(Candidate, BTreeSet<String>, f64)> = Vec::new();

    for candidate in candidates {
        let w = weight(&candidate, config);
        let joined = clusters.iter_mut().find(|(rep, _, _)| {
            jaccard_text(&rep.text, &candidate.text) >= config.dedup_threshold
        });
        match joined {
            Some((rep, sources, score)) => {
                sources.insert(candidate.mode_id.clone());
                if w > *score {
                    *score = w;
                    rep.text = candidate.text.clone();
                    rep.impact = candidate.impact;
                }
            }
            None => {
                let mut sources = BTreeSet::new();
                sources.insert(candidate.mode_id.clone());
                clusters.push((candidate, sources, w));
            }
        }
    }

    let mut merged: Vec<MergedEntry> = clusters
        .into_iter()
        .map(|(rep, sources, score)| MergedEntry {
            text: rep.text,
            impact: rep.impact,
            source_modes: sources,
            merge_score: score,
        })
        .collect();

    if config.prefer_high_impact {
        merged.sort_by(|a, b| b.merge_score.partial_cmp(&a.merge_score).unwrap());
    }
    merged
}

fn take_limit(mut entries: Vec<MergedEntry>, limit: usize) -> Vec<MergedEntry> {
    if limit > 0 && entries.len() > limit {
        entries.truncate(limit);
    }
    entries
}

/// Summarize the batch's theses: a single output's thesis stands as-is;
/// when every pair of theses agrees (min pairwise Jaccard similarity at or
/// above the dedup threshold), the highest-confidence thesis text speaks
/// for the consensus. Otherwise falls back to a count/confidence digest,
/// since there is no single sentence that fairly represents disagreement.
fn thesis_summary(outputs: &[ModeOutput], config: &MergeConfig) -> String {
    if let [only] = outputs {
        return only.thesis.clone();
    }

    let min_similarity = outputs
        .iter()
        .enumerate()
        .flat_map(|(i, a)| outputs[i + 1..].iter().map(move |b| jaccard_text(&a.thesis, &b.thesis)))
        .fold(1.0_f64, f64::min);

    if min_similarity >= config.dedup_threshold {
        return outputs
            .iter()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
            .expect("outputs is non-empty")
            .thesis
            .clone();
    }

    let avg_confidence = outputs.iter().map(|o| o.confidence).sum::<f64>() / outputs.len() as f64;
    format!("{} mode(s) produced output; average confidence {avg_confidence:.2}.", outputs.len())
}

/// Perform the deterministic, non-agent merge over a batch of collected
/// `ModeOutput`s. Returns `SynthesisInsufficientOutputs` when called with
/// zero outputs — Stage 3 has nothing to synthesize.
pub fn merge(outputs: &[ModeOutput], config: &MergeConfig) -> Result<SynthesisResult, DomainError> {
    if outputs.is_empty() {
        return Err(DomainError::SynthesisInsufficientOutputs { have: 0, need: 1 });
    }

    let findings: Vec<Candidate> = outputs
        .iter()
        .flat_map(|o| {
            o.top_findings.iter().filter(|f| f.confidence >= config.min_confidence).map(|f| {
                Candidate {
                    text: f.text.clone(),
                    impact: f.impact,
                    confidence: f.confidence,
                    mode_id: o.mode_id.clone(),
                }
            })
        })
        .collect();

    let risks: Vec<Candidate> = outputs
        .iter()
        .flat_map(|o| {
            o.risks.iter().map(|r| Candidate {
                text: r.text.clone(),
                impact: Some(r.impact),
                confidence: r.likelihood,
                mode_id: o.mode_id.clone(),
            })
        })
        .collect();

    let recommendations: Vec<Candidate> = outputs
        .iter()
        .flat_map(|o| {
            o.recommendations.iter().map(|r| Candidate {
                text: r.text.clone(),
                impact: Some(r.priority),
                confidence: 1.0,
                mode_id: o.mode_id.clone(),
            })
        })
        .collect();

    let questions_for_user: Vec<String> = {
        let mut seen = BTreeSet::new();
        outputs
            .iter()
            .flat_map(|o| o.questions_for_user.iter().cloned())
            .filter(|q| seen.insert(q.clone()))
            .collect()
    };

    let avg_confidence = outputs.iter().map(|o| o.confidence).sum::<f64>() / outputs.len() as f64;

    let summary = thesis_summary(outputs, config);

    Ok(SynthesisResult {
        summary,
        findings: take_limit(dedup_and_merge(findings, config), config.max_findings),
        risks: take_limit(dedup_and_merge(risks, config), config.max_risks),
        recommendations: take_limit(dedup_and_merge(recommendations, config), config.max_recommendations),
        questions_for_user,
        confidence: avg_confidence,
        generated_at: Utc::now(),
    })
}

/// Divergence threshold below which two modes' theses are considered to
/// disagree on the same topic rather than merely phrase it differently.
const DIVERGENCE_THRESHOLD: f64 = 0.3;

/// Compare every pair of mode theses and flag pairs whose similarity falls
/// under `DIVERGENCE_THRESHOLD` as a conflict — the two modes addressed
/// related ground but reached dissimilar conclusions.
pub fn audit(outputs: &[ModeOutput]) -> AuditReport {
    let mut conflicts = Vec::new();
    let mut mode_disagreements: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();

    for i in 0..outputs.len() {
        for j in (i + 1)..outputs.len() {
            let a = &outputs[i];
            let b = &outputs[j];
            let similarity = jaccard_text(&a.thesis, &b.thesis);
            if similarity < DIVERGENCE_THRESHOLD {
                let severity = if similarity < DIVERGENCE_THRESHOLD / 2.0 {
                    Severity::High
                } else {
                    Severity::Medium
                };
                conflicts.push(DetailedConflict {
                    topic: format!("{} vs {}", a.mode_id, b.mode_id),
                    positions: vec![
                        ConflictPosition {
                            mode_id: a.mode_id.clone(),
                            position_text: a.thesis.clone(),
                            evidence: a.top_findings.first().map(|f| f.text.clone()),
                            confidence: a.confidence,
                        },
                        ConflictPosition {
                            mode_id: b.mode_id.clone(),
                            position_text: b.thesis.clone(),
                            evidence: b.top_findings.first().map(|f| f.text.clone()),
                            confidence: b.confidence,
                        },
                    ],
                    severity,
                    resolution_path: "surface both positions to the user for adjudication".to_string(),
                });
                mode_disagreements.entry(a.mode_id.clone()).or_default().push(b.mode_id.clone());
                mode_disagreements.entry(b.mode_id.clone()).or_default().push(a.mode_id.clone());
            }
        }
    }

    let resolution_suggestions = if conflicts.is_empty() {
        Vec::new()
    } else {
        vec![format!("{} divergent pair(s) found; review before acting", conflicts.len())]
    };

    AuditReport { conflicts, mode_disagreements, resolution_suggestions }
}

/// Render the prompt an external agent would complete for a
/// non-`manual` synthesis strategy. Purely a template fill — no network
/// call happens here.
pub fn synthesizer_prompt(strategy_name: &str, mechanical: &SynthesisResult, audit: &AuditReport) -> String {
    format!(
        "Synthesize the following mode outputs using the '{strategy}' strategy.\n\n\
         Mechanical merge summary: {summary}\n\
         Findings: {n_findings}\n\
         Risks: {n_risks}\n\
         Recommendations: {n_recs}\n\
         Conflicts detected: {n_conflicts}\n\n\
         Produce a refined synthesis that resolves the conflicts where possible \
         and explains any that remain.",
        strategy = strategy_name,
        summary = mechanical.summary,
        n_findings = mechanical.findings.len(),
        n_risks = mechanical.risks.len(),
        n_recs = mechanical.recommendations.len(),
        n_conflicts = audit.conflicts.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::mode_output::Finding;

    fn output(mode_id: &str, thesis: &str, finding_text: &str, impact: Impact) -> ModeOutput {
        ModeOutput {
            mode_id: mode_id.to_string(),
            thesis: thesis.to_string(),
            top_findings: vec![Finding { text: finding_text.to_string(), confidence: 0.8, impact: Some(impact) }],
            risks: vec![],
            recommendations: vec![],
            questions_for_user: vec![],
            confidence: 0.8,
            raw_output: String::new(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_outputs_rejected() {
        let err = merge(&[], &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, DomainError::SynthesisInsufficientOutputs { .. }));
    }

    #[test]
    fn similar_findings_deduplicate_with_combined_sources() {
        let outputs = vec![
            output("A1", "root cause is the cache", "the cache is stale", Impact::High),
            output("A2", "root cause is the cache", "the cache is Stale!", Impact::High),
        ];
        let result = merge(&outputs, &MergeConfig::default()).unwrap();
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].source_modes.len(), 2);
    }

    #[test]
    fn dissimilar_theses_flagged_as_conflict() {
        let outputs = vec![
            output("A1", "the database is the bottleneck", "slow queries", Impact::High),
            output("A2", "users misunderstand the UI entirely", "confusing labels", Impact::Medium),
        ];
        let report = audit(&outputs);
        assert!(!report.conflicts.is_empty());
    }

    #[test]
    fn max_findings_limit_is_respected() {
        let outputs = vec![
            output("A1", "t1", "finding one", Impact::High),
            output("A2", "t1", "finding two entirely different", Impact::High),
            output("A3", "t1", "finding three also unrelated", Impact::High),
        ];
        let config = MergeConfig { max_findings: 1, ..MergeConfig::default() };
        let result = merge(&outputs, &config).unwrap();
        assert_eq!(result.findings.len(), 1);
    }
}
