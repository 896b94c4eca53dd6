//! Mode Run Coordinator
//!
//! Drives one assignment per reasoning mode concurrently: writes the
//! prompt into its pane, polls the pane's captured output until a
//! completion marker appears, tracks spend against the shared budget, and
//! evaluates the early-stop predicate after each accepted output. Modeled
//! on the JoinSet-plus-aggregator-channel shape used for parallel model
//! querying elsewhere in this codebase, generalized from a single
//! request/response call to a poll loop against pane capture.

use std::sync::Arc;
use std::time::Duration;

use ensemble_domain::budget::BudgetState;
use ensemble_domain::core::text::jaccard_text;
use ensemble_domain::mode_output::ModeOutput;
use ensemble_domain::pane::AgentKind;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ports::pane_transport::PaneTransport;
use crate::use_cases::output_collector::parse_mode_output;

/// The marker an agent pane is asked to print once its structured output
/// block is complete. A poll sees this exact line before it stops
/// capturing.
pub const COMPLETION_MARKER: &str = "<<ENSEMBLE_MODE_DONE>>";

#[derive(Debug, Clone)]
pub struct CoordinatorAssignment {
    pub mode_id: String,
    pub pane_name: String,
    pub agent_type: AgentKind,
    pub prompt: String,
    /// Rough tokens-per-poll estimate used to charge the budget; a real
    /// tokenizer would replace this, but the pipeline doesn't run
    /// inference itself (Non-goal).
    pub token_cap: u32,
}

#[derive(Debug, Clone)]
pub enum AssignmentOutcome {
    Done(ModeOutput),
    ValidationFailed { mode_id: String, reasons: Vec<String> },
    BudgetExceeded { mode_id: String },
    Error { mode_id: String, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct Stage2Result {
    pub outcomes: Vec<AssignmentOutcome>,
    pub early_stopped: bool,
    pub stop_reason: Option<String>,
}

impl Stage2Result {
    pub fn accepted_outputs(&self) -> Vec<ModeOutput> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                AssignmentOutcome::Done(output) => Some(output.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct CoordinatorConfig {
    pub poll_interval: Duration,
    pub timebox: Duration,
    /// Jaccard similarity above which two accepted theses trigger early
    /// stop (consensus already reached, remaining tasks are cancelled).
    pub early_stop_similarity: Option<f64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            timebox: Duration::from_secs(300),
            early_stop_similarity: None,
        }
    }
}

pub struct ModeRunCoordinator {
    transport: Arc<dyn PaneTransport>,
}

impl ModeRunCoordinator {
    pub fn new(transport: Arc<dyn PaneTransport>) -> Self {
        Self { transport }
    }

    pub async fn run(
        &self,
        assignments: Vec<CoordinatorAssignment>,
        budget: Arc<Mutex<BudgetState>>,
        config: CoordinatorConfig,
    ) -> Stage2Result {
        let cancel = CancellationToken::new();
        let (agg_tx, mut agg_rx) = mpsc::unbounded_channel::<()>();
        let mut join_set = JoinSet::new();
        let mut accepted_theses: Vec<String> = Vec::new();

        for assignment in assignments {
            let transport = Arc::clone(&self.transport);
            let budget = Arc::clone(&budget);
            let cancel = cancel.clone();
            let agg_tx = agg_tx.clone();
            let poll_interval = config.poll_interval;

            join_set.spawn(async move {
                let outcome = run_one_assignment(transport.as_ref(), &assignment, &budget, &cancel, poll_interval).await;
                let _ = agg_tx.send(());
                outcome
            });
        }
        drop(agg_tx);

        let mut stage = Stage2Result::default();
        let timebox = tokio::time::sleep(config.timebox);
        tokio::pin!(timebox);
        let mut timed_out = false;

        loop {
            tokio::select! {
                biased;
                () = &mut timebox, if !timed_out => {
                    timed_out = true;
                    cancel.cancel();
                    stage.early_stopped = true;
                    stage.stop_reason = Some("timebox reached".to_string());
                }
                Some(()) = agg_rx.recv() => {
                    continue;
                }
                result = join_set.join_next() => {
                    let Some(result) = result else { break };
                    match result {
                        Ok(outcome) => {
                            if let AssignmentOutcome::Done(output) = &outcome
                                && let Some(threshold) = config.early_stop_similarity
                            {
                                if accepted_theses.iter().any(|t| jaccard_text(t, &output.thesis) >= threshold) {
                                    cancel.cancel();
                                    stage.early_stopped = true;
                                    stage.stop_reason = Some("early-stop consensus reached".to_string());
                                }
                                accepted_theses.push(output.thesis.clone());
                            }
                            stage.outcomes.push(outcome);
                        }
                        Err(join_err) => {
                            warn!("mode task join error: {join_err}");
                        }
                    }
                }
            }
        }

        stage
    }
}

async fn run_one_assignment(
    transport: &dyn PaneTransport,
    assignment: &CoordinatorAssignment,
    budget: &Arc<Mutex<BudgetState>>,
    cancel: &CancellationToken,
    poll_interval: Duration,
) -> AssignmentOutcome {
    if let Err(e) = transport.send(&assignment.pane_name, &assignment.prompt).await {
        return AssignmentOutcome::Error { mode_id: assignment.mode_id.clone(), reason: e.to_string() };
    }

    loop {
        if cancel.is_cancelled() {
            return AssignmentOutcome::Error { mode_id: assignment.mode_id.clone(), reason: "canceled".to_string() };
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                return AssignmentOutcome::Error { mode_id: assignment.mode_id.clone(), reason: "canceled".to_string() };
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        let captured = match transport.capture(&assignment.pane_name).await {
            Ok(text) => text,
            Err(e) => return AssignmentOutcome::Error { mode_id: assignment.mode_id.clone(), reason: e.to_string() },
        };

        if !captured.contains(COMPLETION_MARKER) {
            let spent_this_poll = (captured.len() as u32).div_ceil(4).min(assignment.token_cap);
            let mut state = budget.lock().await;
            let report = state.report(&assignment.mode_id, spent_this_poll.min(64));
            if !report.allowed {
                let reason = report.message.unwrap_or_default();
                info!(mode_id = %assignment.mode_id, %reason, "budget exceeded during poll");
                return AssignmentOutcome::BudgetExceeded { mode_id: assignment.mode_id.clone() };
            }
            continue;
        }

        let (output, errors) = parse_mode_output(&assignment.mode_id, &captured);
        if !errors.is_empty() {
            return AssignmentOutcome::ValidationFailed { mode_id: assignment.mode_id.clone(), reasons: errors };
        }
        return AssignmentOutcome::Done(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::pane_transport::PaneTransportError;
    use async_trait::async_trait;
    use ensemble_domain::budget::BudgetConfig;
    use ensemble_domain::pane::Pane;
    use std::collections::HashMap;
    use tokio::sync::Mutex as TokioMutex;

    struct StubTransport {
        captures: TokioMutex<HashMap<String, Vec<String>>>,
    }

    #[async_trait]
    impl PaneTransport for StubTransport {
        async fn send(&self, _pane_name: &str, _text: &str) -> Result<(), PaneTransportError> {
            Ok(())
        }

        async fn capture(&self, pane_name: &str) -> Result<String, PaneTransportError> {
            let mut captures = self.captures.lock().await;
            let queue = captures.entry(pane_name.to_string()).or_default();
            if queue.len() > 1 {
                Ok(queue.remove(0))
            } else {
                Ok(queue.first().cloned().unwrap_or_default())
            }
        }

        async fn list_panes(&self) -> Result<Vec<Pane>, PaneTransportError> {
            Ok(vec![])
        }
    }

    fn done_payload(mode_id: &str) -> String {
        format!(
            r#"{{"thesis": "answer from {mode_id}", "top_findings": [{{"text": "evidence", "confidence": 0.8, "impact": "high"}}], "confidence": 0.8}}
            {marker}"#,
            mode_id = mode_id,
            marker = COMPLETION_MARKER,
        )
    }

    #[tokio::test]
    async fn completes_assignment_once_marker_appears() {
        let mut captures = HashMap::new();
        captures.insert("p0".to_string(), vec!["still working".to_string(), done_payload("A1")]);
        let transport = Arc::new(StubTransport { captures: TokioMutex::new(captures) });
        let coordinator = ModeRunCoordinator::new(transport);

        let budget = Arc::new(Mutex::new(BudgetState::new(BudgetConfig::default())));
        let assignments = vec![CoordinatorAssignment {
            mode_id: "A1".to_string(),
            pane_name: "p0".to_string(),
            agent_type: AgentKind::Codex,
            prompt: "go".to_string(),
            token_cap: 20_000,
        }];
        let config = CoordinatorConfig { poll_interval: Duration::from_millis(1), ..CoordinatorConfig::default() };

        let result = coordinator.run(assignments, budget, config).await;
        assert_eq!(result.outcomes.len(), 1);
        assert!(matches!(result.outcomes[0], AssignmentOutcome::Done(_)));
    }

    #[tokio::test]
    async fn budget_exceeded_marks_that_assignment_only() {
        let mut captures = HashMap::new();
        captures.insert("p0".to_string(), vec!["still working".to_string()]);
        captures.insert("p1".to_string(), vec!["still working".to_string(), done_payload("B1")]);
        let transport = Arc::new(StubTransport { captures: TokioMutex::new(captures) });
        let coordinator = ModeRunCoordinator::new(transport);

        let tight_budget = BudgetConfig { max_tokens_per_mode: 10, max_total_tokens: 100_000, ..BudgetConfig::default() };
        let budget = Arc::new(Mutex::new(BudgetState::new(tight_budget)));
        let assignments = vec![
            CoordinatorAssignment {
                mode_id: "A1".to_string(),
                pane_name: "p0".to_string(),
                agent_type: AgentKind::Codex,
                prompt: "go".to_string(),
                token_cap: 20_000,
            },
            CoordinatorAssignment {
                mode_id: "B1".to_string(),
                pane_name: "p1".to_string(),
                agent_type: AgentKind::Gemini,
                prompt: "go".to_string(),
                token_cap: 20_000,
            },
        ];
        let config = CoordinatorConfig {
            poll_interval: Duration::from_millis(1),
            timebox: Duration::from_secs(5),
            ..CoordinatorConfig::default()
        };

        let result = coordinator.run(assignments, budget, config).await;
        assert_eq!(result.outcomes.len(), 2);
        assert!(result
            .outcomes
            .iter()
            .any(|o| matches!(o, AssignmentOutcome::BudgetExceeded { mode_id } if mode_id == "A1")));
        assert!(result
            .outcomes
            .iter()
            .any(|o| matches!(o, AssignmentOutcome::Done(output) if output.mode_id == "B1")));
    }

    #[tokio::test]
    async fn timebox_marks_slow_assignment_as_canceled() {
        let mut captures = HashMap::new();
        captures.insert("p0".to_string(), vec!["still working".to_string()]);
        let transport = Arc::new(StubTransport { captures: TokioMutex::new(captures) });
        let coordinator = ModeRunCoordinator::new(transport);

        let budget = Arc::new(Mutex::new(BudgetState::new(BudgetConfig::default())));
        let assignments = vec![CoordinatorAssignment {
            mode_id: "A1".to_string(),
            pane_name: "p0".to_string(),
            agent_type: AgentKind::Codex,
            prompt: "go".to_string(),
            token_cap: 20_000,
        }];
        let config = CoordinatorConfig {
            poll_interval: Duration::from_millis(5),
            timebox: Duration::from_millis(30),
            ..CoordinatorConfig::default()
        };

        let result = coordinator.run(assignments, budget, config).await;
        assert!(result.early_stopped);
        assert_eq!(result.stop_reason.as_deref(), Some("timebox reached"));
        assert!(matches!(
            &result.outcomes[0],
            AssignmentOutcome::Error { reason, .. } if reason == "canceled"
        ));
    }

    #[tokio::test]
    async fn early_stop_cancels_remaining_assignments_on_consensus() {
        let mut captures = HashMap::new();
        captures.insert("p0".to_string(), vec!["still working".to_string(), done_payload("A1")]);
        captures.insert("p1".to_string(), vec!["still working".to_string(), done_payload("A1")]);
        captures.insert("p2".to_string(), vec!["still working".to_string()]);
        let transport = Arc::new(StubTransport { captures: TokioMutex::new(captures) });
        let coordinator = ModeRunCoordinator::new(transport);

        let budget = Arc::new(Mutex::new(BudgetState::new(BudgetConfig::default())));
        let assignments = vec![
            CoordinatorAssignment {
                mode_id: "A1".to_string(),
                pane_name: "p0".to_string(),
                agent_type: AgentKind::Codex,
                prompt: "go".to_string(),
                token_cap: 20_000,
            },
            CoordinatorAssignment {
                mode_id: "A2".to_string(),
                pane_name: "p1".to_string(),
                agent_type: AgentKind::Gemini,
                prompt: "go".to_string(),
                token_cap: 20_000,
            },
            CoordinatorAssignment {
                mode_id: "A3".to_string(),
                pane_name: "p2".to_string(),
                agent_type: AgentKind::Aider,
                prompt: "go".to_string(),
                token_cap: 20_000,
            },
        ];
        let config = CoordinatorConfig {
            poll_interval: Duration::from_millis(1),
            timebox: Duration::from_secs(5),
            early_stop_similarity: Some(0.8),
        };

        let result = coordinator.run(assignments, budget, config).await;
        assert!(result.early_stopped);
        assert_eq!(result.stop_reason.as_deref(), Some("early-stop consensus reached"));
        assert!(result
            .outcomes
            .iter()
            .any(|o| matches!(o, AssignmentOutcome::Error { mode_id, .. } if mode_id == "A3")));
    }
}
