//! Named mode bundles, possibly extending one another.

use serde::{Deserialize, Serialize};

use crate::core::error::DomainError;

pub const MIN_PRESET_MODES: usize = 2;
pub const MAX_PRESET_MODES: usize = 10;
pub const MAX_EXTENDS_DEPTH: usize = 3;

/// A mode reference within a preset: either a stable id or a short code.
/// Both forms are resolved against the catalog at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeRef {
    Id(String),
    Code(String),
}

impl ModeRef {
    pub fn as_str(&self) -> &str {
        match self {
            ModeRef::Id(s) | ModeRef::Code(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePreset {
    pub name: String,
    pub description: String,
    pub modes: Vec<ModeRef>,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub synthesis_strategy: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EnsemblePreset {
    /// Structural validation that doesn't require the rest of the catalog:
    /// mode count bounds, no duplicate mode references, and no
    /// self-extension. Cycle and depth checks need the full catalog and
    /// live in [`super::registry::Catalog::resolve_preset`].
    pub fn validate_standalone(&self) -> Result<(), DomainError> {
        if self.modes.len() < MIN_PRESET_MODES {
            return Err(DomainError::ConfigInvalid(format!(
                "preset {} has {} modes, minimum is {MIN_PRESET_MODES}",
                self.name,
                self.modes.len()
            )));
        }
        if self.modes.len() > MAX_PRESET_MODES {
            return Err(DomainError::ConfigInvalid(format!(
                "preset {} has {} modes, maximum is {MAX_PRESET_MODES}",
                self.name,
                self.modes.len()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for m in &self.modes {
            if !seen.insert(m.as_str()) {
                return Err(DomainError::ConfigInvalid(format!(
                    "preset {} references mode {} more than once",
                    self.name,
                    m.as_str()
                )));
            }
        }
        if self.extends.as_deref() == Some(self.name.as_str()) {
            return Err(DomainError::ConfigInvalid(format!(
                "preset {} cannot extend itself",
                self.name
            )));
        }
        Ok(())
    }
}
