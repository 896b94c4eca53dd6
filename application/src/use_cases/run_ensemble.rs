//! Ensemble Orchestrator
//!
//! Top-level entry point tying the three pipeline stages together:
//! Context Pack Generator, Mode Run Coordinator, and Merger/Auditor/
//! Synthesizer. Shaped directly after a use case that holds `Arc<dyn
//! Port>` handles and exposes an `execute`/`execute_with_progress` pair —
//! here split into `run` (full pipeline) and `dry_run` (stages 1 and
//! planning only, no pane writes).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ensemble_domain::budget::{BudgetConfig, BudgetState};
use ensemble_domain::cache::{build_fingerprint, ModeOutputFingerprint};
use ensemble_domain::catalog::Catalog;
use ensemble_domain::core::error::DomainError;
use ensemble_domain::core::Question;
use ensemble_domain::session::{EnsembleSession, ModeAssignment};
use ensemble_domain::synthesis::{MergeConfig, SynthesisStrategy};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::ports::cache::Cache;
use crate::ports::event_bus::{EnsembleEvent, EventBus};
use crate::ports::pane_transport::PaneTransport;
use crate::ports::state_store::StateStore;
use crate::use_cases::assignment_planner::{plan_assignments, CategoryAffinity, ExplicitAssignments};
use crate::use_cases::context_pack_generator::{generate_context_pack, ProjectSection};
use crate::use_cases::mode_run_coordinator::{
    AssignmentOutcome, CoordinatorAssignment, CoordinatorConfig, ModeRunCoordinator,
};
use crate::use_cases::synthesizer::{audit, merge, synthesizer_prompt};

#[derive(Error, Debug)]
pub enum RunEnsembleError {
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Everything a run needs, bundled once in the caller's wiring code
/// (the CLI's `main.rs`) and shared across use cases behind `Arc`.
pub struct Services {
    pub catalog: Arc<Catalog>,
    pub cache: Arc<dyn Cache>,
    pub state_store: Arc<dyn StateStore>,
    pub event_bus: Arc<dyn EventBus>,
    pub pane_transport: Arc<dyn PaneTransport>,
}

pub struct RunEnsembleInput {
    pub session_name: String,
    pub question: Question,
    pub preset_name: Option<String>,
    pub explicit_modes: Vec<String>,
    pub project_id: String,
    pub sections: Vec<ProjectSection>,
    pub budget_config: BudgetConfig,
    pub synthesis_strategy: SynthesisStrategy,
    pub merge_config: MergeConfig,
    pub category_affinity: CategoryAffinity,
    pub explicit_assignments: ExplicitAssignments,
    pub coordinator_config: CoordinatorConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct DryRunPlan {
    pub session_name: String,
    pub context_hash: String,
    pub context_is_thin: bool,
    pub planned_mode_ids: Vec<String>,
    pub fallback_assignments: Vec<String>,
}

pub struct EnsembleOrchestrator {
    services: Services,
}

impl EnsembleOrchestrator {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    fn resolve_modes(&self, input: &RunEnsembleInput) -> Result<Vec<&ensemble_domain::catalog::ReasoningMode>, DomainError> {
        if let Some(preset_name) = &input.preset_name {
            return self.services.catalog.resolve_preset(preset_name);
        }
        input
            .explicit_modes
            .iter()
            .map(|id| self.services.catalog.get_mode(id))
            .collect()
    }

    /// Stage 1: build the context pack and resolve the mode plan without
    /// touching any pane.
    pub async fn run_stage1(
        &self,
        input: &RunEnsembleInput,
    ) -> Result<DryRunPlan, RunEnsembleError> {
        let pack = generate_context_pack(&input.question, &input.project_id, &input.sections);
        let modes = self.resolve_modes(input)?;
        let panes = self.services.pane_transport.list_panes().await.map_err(|e| {
            DomainError::PaneCaptureFailed(e.to_string())
        })?;
        let planned = plan_assignments(&modes, &panes, &input.category_affinity, &input.explicit_assignments)?;

        let context_is_thin = pack.is_thin();
        Ok(DryRunPlan {
            session_name: input.session_name.clone(),
            context_hash: pack.hash,
            context_is_thin,
            planned_mode_ids: modes.iter().map(|m| m.id.clone()).collect(),
            fallback_assignments: planned
                .iter()
                .filter(|a| a.fallback)
                .map(|a| a.mode_id.clone())
                .collect(),
        })
    }

    /// Full pipeline: Stage 1 (context+plan) -> Stage 2 (mode run,
    /// consulting the fingerprint cache before spawning a pane task) ->
    /// Stage 3 (merge/audit/synthesize), with the session persisted to
    /// the state store at each transition.
    pub async fn run(&self, input: RunEnsembleInput) -> Result<EnsembleSession, RunEnsembleError> {
        let mut session = EnsembleSession::new(
            input.session_name.clone(),
            input.question.content(),
            input.synthesis_strategy.name(),
        );
        session.preset_used = input.preset_name.clone();

        self.services.event_bus.publish(EnsembleEvent::StageStarted {
            session_name: session.session_name.clone(),
            stage: "intake".to_string(),
            at: Utc::now(),
        });

        let pack = generate_context_pack(&input.question, &input.project_id, &input.sections);
        let modes = match self.resolve_modes(&input) {
            Ok(modes) => modes,
            Err(e) => {
                session.mark_failed(e.to_string());
                self.persist(&session).await;
                return Err(e.into());
            }
        };

        let panes = self
            .services
            .pane_transport
            .list_panes()
            .await
            .map_err(|e| DomainError::PaneCaptureFailed(e.to_string()))?;
        let planned = plan_assignments(&modes, &panes, &input.category_affinity, &input.explicit_assignments)?;

        for p in &planned {
            session.assignments.push(ModeAssignment::new(p.mode_id.clone(), p.pane_name.clone(), p.agent_type.clone()));
        }

        self.services.event_bus.publish(EnsembleEvent::StageStarted {
            session_name: session.session_name.clone(),
            stage: "mode_run".to_string(),
            at: Utc::now(),
        });

        let budget = Arc::new(Mutex::new(BudgetState::new(input.budget_config)));
        let coordinator = ModeRunCoordinator::new(Arc::clone(&self.services.pane_transport));

        let mut assignments = Vec::new();
        let mut cached_outputs = Vec::new();
        let mut fingerprints: HashMap<String, ModeOutputFingerprint> = HashMap::new();
        for p in &planned {
            let mode = modes.iter().find(|m| m.id == p.mode_id).expect("mode was resolved moments ago");
            let fingerprint = build_fingerprint(
                &pack.hash,
                &mode.id,
                &mode.version,
                input.question.content(),
                &p.agent_type.to_string(),
                mode.default_token_cap,
            );
            match self.services.cache.lookup(&fingerprint).await {
                Ok(lookup) if lookup.hit => {
                    if let Some(output) = lookup.output {
                        if let Some(assignment) = session.assignment_mut(&p.mode_id) {
                            assignment.mark_done(None);
                        }
                        cached_outputs.push(output);
                        continue;
                    }
                }
                _ => {}
            }
            fingerprints.insert(p.mode_id.clone(), fingerprint);
            assignments.push(CoordinatorAssignment {
                mode_id: p.mode_id.clone(),
                pane_name: p.pane_name.clone(),
                agent_type: p.agent_type.clone(),
                prompt: build_prompt(&input, mode.id.as_str()),
                token_cap: mode.default_token_cap,
            });
        }

        let stage2 = coordinator.run(assignments, budget, input.coordinator_config).await;

        for outcome in &stage2.outcomes {
            match outcome {
                AssignmentOutcome::Done(output) => {
                    if let Some(assignment) = session.assignment_mut(&output.mode_id) {
                        assignment.mark_done(None);
                    }
                    if let Some(fingerprint) = fingerprints.get(&output.mode_id)
                        && let Err(e) = self.services.cache.store(fingerprint, output).await
                    {
                        tracing::warn!("failed to cache output for {}: {e}", output.mode_id);
                    }
                }
                AssignmentOutcome::ValidationFailed { mode_id, reasons } => {
                    if let Some(assignment) = session.assignment_mut(mode_id) {
                        assignment.mark_error(reasons.join("; "));
                    }
                }
                AssignmentOutcome::BudgetExceeded { mode_id } => {
                    if let Some(assignment) = session.assignment_mut(mode_id) {
                        assignment.mark_error("budget exceeded");
                    }
                }
                AssignmentOutcome::Error { mode_id, reason } => {
                    if let Some(assignment) = session.assignment_mut(mode_id) {
                        assignment.mark_error(reason.clone());
                    }
                }
            }
        }

        let mut outputs = stage2.accepted_outputs();
        outputs.extend(cached_outputs);

        self.services.event_bus.publish(EnsembleEvent::StageStarted {
            session_name: session.session_name.clone(),
            stage: "synthesis".to_string(),
            at: Utc::now(),
        });

        let synthesis = match merge(&outputs, &input.merge_config) {
            Ok(result) => result,
            Err(e) => {
                session.mark_failed(e.to_string());
                self.persist(&session).await;
                return Err(e.into());
            }
        };
        let report = audit(&outputs);
        if input.synthesis_strategy.wants_agent_prompt() {
            let _prompt = synthesizer_prompt(input.synthesis_strategy.name(), &synthesis, &report);
        }

        session.mark_complete(synthesis);
        info!(session_name = %session.session_name, "ensemble run complete");
        self.persist(&session).await;

        Ok(session)
    }

    async fn persist(&self, session: &EnsembleSession) {
        if let Err(e) = self.services.state_store.save(session).await {
            tracing::warn!("failed to persist session {}: {e}", session.session_name);
        }
    }
}

fn build_prompt(input: &RunEnsembleInput, mode_id: &str) -> String {
    format!(
        "Reasoning mode {mode_id}. Question: {question}\nRespond with a JSON object per the ensemble output schema, then print {marker} on its own line.",
        mode_id = mode_id,
        question = input.question.content(),
        marker = crate::use_cases::mode_run_coordinator::COMPLETION_MARKER,
    )
}

