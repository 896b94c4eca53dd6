//! Token budget configuration and runtime state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::error::DomainError;

/// Immutable budget limits for one ensemble run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub max_tokens_per_mode: u32,
    pub max_total_tokens: u32,
    pub synthesis_reserve_tokens: u32,
    pub context_reserve_tokens: u32,
}

impl BudgetConfig {
    /// Validate the invariants from the data model: `per_mode <= total`,
    /// `reserves <= total`, no negative/zero-degenerate magnitudes.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_total_tokens == 0 || self.max_tokens_per_mode == 0 {
            return Err(DomainError::BudgetInvalid(
                "token limits must be positive".into(),
            ));
        }
        if self.max_tokens_per_mode > self.max_total_tokens {
            return Err(DomainError::BudgetInvalid(
                "max_tokens_per_mode exceeds max_total_tokens".into(),
            ));
        }
        let reserves = self
            .synthesis_reserve_tokens
            .saturating_add(self.context_reserve_tokens);
        if reserves > self.max_total_tokens {
            return Err(DomainError::BudgetInvalid(
                "reserves exceed max_total_tokens".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_mode: 20_000,
            max_total_tokens: 150_000,
            synthesis_reserve_tokens: 10_000,
            context_reserve_tokens: 5_000,
        }
    }
}

/// Result of reporting token expenditure to the [`BudgetState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetReport {
    pub allowed: bool,
    pub remaining: u32,
    pub total_remaining: u32,
    pub message: Option<String>,
}

/// Mutable per-run budget tracking. All mutation happens through `&mut self`
/// behind a single serialized path (the coordinator wraps this in a mutex);
/// reads are cheap snapshots.
#[derive(Debug, Clone, Default)]
pub struct BudgetState {
    per_agent_spent: HashMap<String, u32>,
    total_spent: u32,
    config: BudgetConfig,
}

impl BudgetState {
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            per_agent_spent: HashMap::new(),
            total_spent: 0,
            config,
        }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Report additional token expenditure for `mode_id`. Returns the
    /// allow/deny decision and remaining budgets.
    pub fn report(&mut self, mode_id: &str, tokens: u32) -> BudgetReport {
        let spent_for_mode = self.per_agent_spent.entry(mode_id.to_string()).or_insert(0);
        *spent_for_mode += tokens;
        self.total_spent += tokens;

        let spent_for_mode = *spent_for_mode;
        let remaining = self.config.max_tokens_per_mode.saturating_sub(spent_for_mode);
        let total_remaining = self.config.max_total_tokens.saturating_sub(self.total_spent);

        if self.total_spent >= self.config.max_total_tokens {
            return BudgetReport {
                allowed: false,
                remaining,
                total_remaining,
                message: Some("total budget exceeded".to_string()),
            };
        }
        if spent_for_mode >= self.config.max_tokens_per_mode {
            return BudgetReport {
                allowed: false,
                remaining,
                total_remaining,
                message: Some("agent budget exceeded".to_string()),
            };
        }
        BudgetReport {
            allowed: true,
            remaining,
            total_remaining,
            message: None,
        }
    }

    pub fn remaining_for_agent(&self, mode_id: &str) -> u32 {
        let spent = self.per_agent_spent.get(mode_id).copied().unwrap_or(0);
        self.config.max_tokens_per_mode.saturating_sub(spent)
    }

    pub fn total_remaining(&self) -> u32 {
        self.config.max_total_tokens.saturating_sub(self.total_spent)
    }

    pub fn is_over_budget(&self, mode_id: &str) -> bool {
        let spent = self.per_agent_spent.get(mode_id).copied().unwrap_or(0);
        spent >= self.config.max_tokens_per_mode
    }

    pub fn is_ensemble_over_budget(&self) -> bool {
        self.total_spent >= self.config.max_total_tokens
    }

    pub fn total_spent(&self) -> u32 {
        self.total_spent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_per_mode_over_total() {
        let cfg = BudgetConfig {
            max_tokens_per_mode: 100,
            max_total_tokens: 50,
            synthesis_reserve_tokens: 0,
            context_reserve_tokens: 0,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_reserves_over_total() {
        let cfg = BudgetConfig {
            max_tokens_per_mode: 10,
            max_total_tokens: 50,
            synthesis_reserve_tokens: 30,
            context_reserve_tokens: 30,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn budget_exceeded_scenario_from_spec() {
        // BudgetConfig{max_tokens_per_mode=1000, max_total_tokens=50000};
        // one task reports 800 then 300.
        let cfg = BudgetConfig {
            max_tokens_per_mode: 1000,
            max_total_tokens: 50_000,
            synthesis_reserve_tokens: 0,
            context_reserve_tokens: 0,
        };
        let mut state = BudgetState::new(cfg);
        let first = state.report("A1", 800);
        assert!(first.allowed);
        let second = state.report("A1", 300);
        assert!(!second.allowed);
        assert_eq!(second.message.as_deref(), Some("agent budget exceeded"));

        // Other modes are unaffected.
        assert!(!state.is_over_budget("B1"));
    }

    #[test]
    fn total_budget_exceeded_message() {
        let cfg = BudgetConfig {
            max_tokens_per_mode: 100_000,
            max_total_tokens: 1_000,
            synthesis_reserve_tokens: 0,
            context_reserve_tokens: 0,
        };
        let mut state = BudgetState::new(cfg);
        let report = state.report("A1", 1_000);
        assert!(!report.allowed);
        assert_eq!(report.message.as_deref(), Some("total budget exceeded"));
    }
}
