//! Reasoning mode descriptors (immutable, loaded at startup).

use serde::{Deserialize, Serialize};

/// Closed category taxonomy for reasoning modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Formal,
    Ampliative,
    Uncertainty,
    Vagueness,
    Change,
    Causal,
    Practical,
    Strategic,
    Dialectical,
    Modal,
    Domain,
    Meta,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Formal => "formal",
            Category::Ampliative => "ampliative",
            Category::Uncertainty => "uncertainty",
            Category::Vagueness => "vagueness",
            Category::Change => "change",
            Category::Causal => "causal",
            Category::Practical => "practical",
            Category::Strategic => "strategic",
            Category::Dialectical => "dialectical",
            Category::Modal => "modal",
            Category::Domain => "domain",
            Category::Meta => "meta",
        };
        write!(f, "{s}")
    }
}

/// Maturity tier of a reasoning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Core,
    Advanced,
    Experimental,
}

/// An immutable reasoning-mode descriptor loaded from the embedded catalog
/// (and optionally overridden by user/project configuration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningMode {
    pub id: String,
    pub code: String,
    pub category: Category,
    pub tier: Tier,
    pub version: String,
    pub short_desc: String,
    pub default_token_cap: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_display_is_lowercase() {
        assert_eq!(Category::Dialectical.to_string(), "dialectical");
    }
}
