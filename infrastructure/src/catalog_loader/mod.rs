//! Mode Catalog & preset loader
//!
//! Loads the embedded mode catalog and layers user/project preset
//! overrides on top with the same precedence the rest of this codebase
//! uses for configuration: embedded defaults, then XDG/user config, then
//! project-level file, then an explicit path — first existing project
//! filename wins.

use std::path::{Path, PathBuf};

use ensemble_domain::catalog::{Catalog, EnsemblePreset, ReasoningMode};
use ensemble_domain::core::error::DomainError;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::Deserialize;

const EMBEDDED_MODES: &str = include_str!("modes.toml");

#[derive(Debug, Deserialize, Default)]
struct ModesFile {
    #[serde(default)]
    mode: Vec<ReasoningMode>,
}

#[derive(Debug, Deserialize, Default)]
struct PresetsFile {
    #[serde(default)]
    preset: Vec<EnsemblePreset>,
}

pub struct CatalogLoader;

impl CatalogLoader {
    /// Global (XDG or fallback) presets file path.
    pub fn global_presets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ensemble").join("presets.toml"))
    }

    /// First existing project-level presets filename, if any.
    pub fn project_presets_path() -> Option<PathBuf> {
        for filename in &["ensemble.toml", ".ensemble.toml"] {
            let path = PathBuf::from(filename);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    pub fn load(explicit_path: Option<&Path>) -> Result<Catalog, DomainError> {
        let mut catalog = Catalog::new();

        let modes_file: ModesFile = toml::from_str(EMBEDDED_MODES)
            .map_err(|e| DomainError::ConfigInvalid(format!("embedded catalog malformed: {e}")))?;
        for mode in modes_file.mode {
            catalog.insert_mode(mode);
        }

        let mut figment = Figment::new();
        if let Some(global) = Self::global_presets_path()
            && global.exists()
        {
            figment = figment.merge(Toml::file(&global));
        }
        if let Some(project) = Self::project_presets_path() {
            figment = figment.merge(Toml::file(&project));
        }
        if let Some(explicit) = explicit_path {
            figment = figment.merge(Toml::file(explicit));
        }

        let presets: PresetsFile = figment
            .extract()
            .map_err(|e| DomainError::ConfigInvalid(format!("preset config invalid: {e}")))?;
        for preset in presets.preset {
            catalog.insert_preset(preset)?;
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_loads_with_no_overrides() {
        let catalog = CatalogLoader::load(None).unwrap();
        assert!(catalog.get_mode_by_code("A1").is_ok());
        assert!(catalog.get_mode("formal-logic").is_ok());
    }
}
