//! In-memory catalog of modes and presets, with preset extension resolution.

use std::collections::HashMap;

use crate::core::error::DomainError;
use crate::core::suggest::closest;

use super::mode::ReasoningMode;
use super::preset::{EnsemblePreset, ModeRef, MAX_EXTENDS_DEPTH};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modes: HashMap<String, ReasoningMode>,
    codes: HashMap<String, String>,
    presets: HashMap<String, EnsemblePreset>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_mode(&mut self, mode: ReasoningMode) {
        self.codes.insert(mode.code.clone(), mode.id.clone());
        self.modes.insert(mode.id.clone(), mode);
    }

    pub fn insert_preset(&mut self, preset: EnsemblePreset) -> Result<(), DomainError> {
        preset.validate_standalone()?;
        self.presets.insert(preset.name.clone(), preset);
        Ok(())
    }

    pub fn get_mode(&self, id: &str) -> Result<&ReasoningMode, DomainError> {
        self.modes.get(id).ok_or_else(|| {
            let ids: Vec<&str> = self.modes.keys().map(String::as_str).collect();
            DomainError::mode_not_found(id, closest(id, &ids, 3))
        })
    }

    pub fn get_mode_by_code(&self, code: &str) -> Result<&ReasoningMode, DomainError> {
        match self.codes.get(code) {
            Some(id) => Ok(&self.modes[id]),
            None => {
                let codes: Vec<&str> = self.codes.keys().map(String::as_str).collect();
                Err(DomainError::mode_code_invalid(code, closest(code, &codes, 3)))
            }
        }
    }

    pub fn get_preset(&self, name: &str) -> Result<&EnsemblePreset, DomainError> {
        self.presets.get(name).ok_or_else(|| {
            let names: Vec<&str> = self.presets.keys().map(String::as_str).collect();
            DomainError::preset_not_found(name, closest(name, &names, 3))
        })
    }

    pub fn list_presets(&self) -> Vec<&EnsemblePreset> {
        let mut out: Vec<&EnsemblePreset> = self.presets.values().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn list_by_tag(&self, tag: &str) -> Vec<&EnsemblePreset> {
        let mut out: Vec<&EnsemblePreset> = self
            .presets
            .values()
            .filter(|p| p.tags.iter().any(|t| t == tag))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    fn resolve_mode_ref(&self, mode_ref: &ModeRef) -> Result<&ReasoningMode, DomainError> {
        match mode_ref {
            ModeRef::Id(id) => self.get_mode(id),
            ModeRef::Code(code) => self.get_mode_by_code(code),
        }
    }

    /// Resolve a preset's full mode list, following `extends` chains.
    /// Detects cycles and enforces the maximum extension depth via an
    /// iterative walk with a visiting set, rather than plain recursion, so a
    /// cycle fails with a named error instead of a stack overflow.
    pub fn resolve_preset(&self, name: &str) -> Result<Vec<&ReasoningMode>, DomainError> {
        let mut chain = Vec::new();
        let mut visiting = std::collections::HashSet::new();
        self.collect_preset_chain(name, &mut chain, &mut visiting, 0)?;

        let mut seen = std::collections::HashSet::new();
        let mut modes = Vec::new();
        for preset_name in &chain {
            let preset = self.get_preset(preset_name)?;
            for mode_ref in &preset.modes {
                let mode = self.resolve_mode_ref(mode_ref)?;
                if seen.insert(mode.id.clone()) {
                    modes.push(mode);
                }
            }
        }
        Ok(modes)
    }

    fn collect_preset_chain(
        &self,
        name: &str,
        chain: &mut Vec<String>,
        visiting: &mut std::collections::HashSet<String>,
        depth: usize,
    ) -> Result<(), DomainError> {
        if depth > MAX_EXTENDS_DEPTH {
            return Err(DomainError::ExtendsDepth {
                preset: name.to_string(),
                max: MAX_EXTENDS_DEPTH,
            });
        }
        if !visiting.insert(name.to_string()) {
            return Err(DomainError::ExtendsCycle(name.to_string()));
        }
        let preset = self.get_preset(name)?;
        if let Some(parent) = &preset.extends {
            self.collect_preset_chain(parent, chain, visiting, depth + 1)?;
        }
        chain.push(name.to_string());
        Ok(())
    }
}
