use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog;
use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::logging::TracingConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub monster_id_threshold: u32,
    pub catalog_path: PathBuf,
    pub spawn_tags_path: PathBuf,
    pub maps_path: PathBuf,
    pub geometry_dir: PathBuf,
    pub output_path: PathBuf,
    /// Resolve maps on the rayon pool instead of one after another
    pub parallel: bool,
    pub logging: TracingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_data_dir(Path::new("data"))
    }
}

impl PipelineConfig {
    /// Defaults with every input under `dir`
    pub fn with_data_dir(dir: &Path) -> Self {
        Self {
            monster_id_threshold: MONSTER_ID_THRESHOLD,
            catalog_path: dir.join(DEFAULT_CATALOG_FILE),
            spawn_tags_path: dir.join(DEFAULT_SPAWN_TAGS_FILE),
            maps_path: dir.join(DEFAULT_MAPS_FILE),
            geometry_dir: dir.join(DEFAULT_GEOMETRY_DIR),
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            parallel: true,
            logging: TracingConfig::default(),
        }
    }

    /// Point every input at `dir`, keeping everything else
    pub fn set_data_dir(&mut self, dir: &Path) {
        let defaults = Self::with_data_dir(dir);
        self.catalog_path = defaults.catalog_path;
        self.spawn_tags_path = defaults.spawn_tags_path;
        self.maps_path = defaults.maps_path;
        self.geometry_dir = defaults.geometry_dir;
    }

    /// Read a `.ron` or `.json` config file; absent fields take defaults
    pub fn load(path: &Path) -> Result<Self> {
        catalog::load_document(path)
    }

    /// Apply `SPAWN_PIPELINE_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.set_data_dir(Path::new(&dir));
        }
        if let Some(output) = lookup(ENV_OUTPUT) {
            self.output_path = PathBuf::from(output);
        }
        if let Some(raw) = lookup(ENV_THRESHOLD) {
            self.monster_id_threshold = raw.trim().parse().map_err(|_| {
                PipelineError::Config(format!("{ENV_THRESHOLD} is not a valid id: {raw}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("catalog_path", &self.catalog_path),
            ("spawn_tags_path", &self.spawn_tags_path),
            ("maps_path", &self.maps_path),
            ("geometry_dir", &self.geometry_dir),
            ("output_path", &self.output_path),
        ];
        for (name, path) in required {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}
