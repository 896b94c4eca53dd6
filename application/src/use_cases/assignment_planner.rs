//! Assignment Planner
//!
//! Pairs each resolved reasoning mode with an available pane. Resolution
//! order mirrors a routing-table lookup: an explicit mode-to-pane mapping
//! wins first, then a category-affinity preference list, then any
//! remaining pane — every fallback decision is recorded so the caller can
//! surface it.

use std::collections::HashMap;

use ensemble_domain::catalog::{Category, ReasoningMode};
use ensemble_domain::core::error::DomainError;
use ensemble_domain::pane::{AgentKind, Pane};

/// One mode paired with the pane it will run in.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAssignment {
    pub mode_id: String,
    pub pane_name: String,
    pub agent_type: AgentKind,
    /// True when no explicit or category-preferred pane was available and
    /// an arbitrary remaining pane was used instead.
    pub fallback: bool,
    pub reason: String,
}

/// Preferred `AgentKind`s for a category, in priority order. Config data
/// in the full system; a caller-supplied map here keeps the planner pure.
pub type CategoryAffinity = HashMap<Category, Vec<AgentKind>>;

/// Explicit mode-id -> pane-name overrides, highest priority.
pub type ExplicitAssignments = HashMap<String, String>;

pub fn plan_assignments(
    modes: &[&ReasoningMode],
    panes: &[Pane],
    affinity: &CategoryAffinity,
    explicit: &ExplicitAssignments,
) -> Result<Vec<PlannedAssignment>, DomainError> {
    if panes.len() < modes.len() {
        return Err(DomainError::AssignmentPaneShortage {
            needed: modes.len(),
            available: panes.len(),
        });
    }

    let mut remaining: Vec<&Pane> = panes.iter().collect();
    remaining.sort_by_key(|p| p.stable_index);
    let mut used_panes = std::collections::HashSet::new();
    let mut assignments = Vec::new();

    for mode in modes {
        let chosen = pick_pane(mode, &remaining, &used_panes, affinity, explicit)?;
        used_panes.insert(chosen.pane.title.clone());
        assignments.push(PlannedAssignment {
            mode_id: mode.id.clone(),
            pane_name: chosen.pane.title.clone(),
            agent_type: chosen.pane.agent_type.clone(),
            fallback: chosen.fallback,
            reason: chosen.reason,
        });
    }

    Ok(assignments)
}

struct Choice<'a> {
    pane: &'a Pane,
    fallback: bool,
    reason: String,
}

fn pick_pane<'a>(
    mode: &ReasoningMode,
    panes: &'a [&'a Pane],
    used: &std::collections::HashSet<String>,
    affinity: &CategoryAffinity,
    explicit: &ExplicitAssignments,
) -> Result<Choice<'a>, DomainError> {
    // 1. Explicit mode -> pane override.
    if let Some(pane_name) = explicit.get(&mode.id) {
        if used.contains(pane_name) {
            return Err(DomainError::AssignmentDuplicatePane(pane_name.clone()));
        }
        let pane = panes
            .iter()
            .find(|p| &p.title == pane_name)
            .copied()
            .ok_or_else(|| DomainError::AssignmentAgentMismatch {
                mode_id: mode.id.clone(),
                agent_type: "explicit".to_string(),
            })?;
        return Ok(Choice {
            pane,
            fallback: false,
            reason: "explicit assignment".to_string(),
        });
    }

    // 2. Category-affinity preference list, in priority order.
    if let Some(preferred) = affinity.get(&mode.category) {
        for kind in preferred {
            if let Some(pane) = panes
                .iter()
                .find(|p| !used.contains(&p.title) && &p.agent_type == kind)
                .copied()
            {
                return Ok(Choice {
                    pane,
                    fallback: false,
                    reason: format!("category affinity: {} prefers {}", mode.category, kind),
                });
            }
        }
    }

    // 3. Any remaining pane.
    let pane = panes
        .iter()
        .find(|p| !used.contains(&p.title))
        .copied()
        .ok_or(DomainError::AssignmentPaneShortage {
            needed: 1,
            available: 0,
        })?;
    Ok(Choice {
        pane,
        fallback: true,
        reason: "no explicit or affinity match, used remaining pane".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::catalog::Tier;

    fn mode(id: &str, category: Category) -> ReasoningMode {
        ReasoningMode {
            id: id.to_string(),
            code: id.to_lowercase(),
            category,
            tier: Tier::Core,
            version: "1.0.0".to_string(),
            short_desc: "d".to_string(),
            default_token_cap: 20_000,
        }
    }

    fn pane(title: &str, kind: AgentKind, idx: u32) -> Pane {
        Pane { title: title.to_string(), agent_type: kind, stable_index: idx }
    }

    #[test]
    fn rejects_when_not_enough_panes() {
        let modes = [mode("A1", Category::Formal), mode("A2", Category::Causal)];
        let modes_ref: Vec<&ReasoningMode> = modes.iter().collect();
        let panes = vec![pane("p0", AgentKind::Codex, 0)];
        let err = plan_assignments(&modes_ref, &panes, &HashMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, DomainError::AssignmentPaneShortage { .. }));
    }

    #[test]
    fn explicit_assignment_wins() {
        let m = mode("A1", Category::Formal);
        let panes = vec![pane("p0", AgentKind::Codex, 0), pane("p1", AgentKind::Gemini, 1)];
        let mut explicit = HashMap::new();
        explicit.insert("A1".to_string(), "p1".to_string());
        let plan = plan_assignments(&[&m], &panes, &HashMap::new(), &explicit).unwrap();
        assert_eq!(plan[0].pane_name, "p1");
        assert!(!plan[0].fallback);
    }

    #[test]
    fn category_affinity_picks_preferred_agent() {
        let m = mode("A1", Category::Causal);
        let panes = vec![pane("p0", AgentKind::Codex, 0), pane("p1", AgentKind::Gemini, 1)];
        let mut affinity = HashMap::new();
        affinity.insert(Category::Causal, vec![AgentKind::Gemini]);
        let plan = plan_assignments(&[&m], &panes, &affinity, &HashMap::new()).unwrap();
        assert_eq!(plan[0].pane_name, "p1");
        assert!(!plan[0].fallback);
    }

    #[test]
    fn falls_back_when_no_preference_matches() {
        let m = mode("A1", Category::Causal);
        let panes = vec![pane("p0", AgentKind::Codex, 0)];
        let mut affinity = HashMap::new();
        affinity.insert(Category::Causal, vec![AgentKind::Gemini]);
        let plan = plan_assignments(&[&m], &panes, &affinity, &HashMap::new()).unwrap();
        assert!(plan[0].fallback);
    }
}
