//! JSON description of a multi-level catalog.
//!
//! ```json
//! {
//!   "layers": [
//!     { "path": "stars_0.cat", "retention": "retain" },
//!     { "path": "stars_1.cat", "trig_mag": 8.0 },
//!     { "path": "/data/gaia_5.cat", "trig_mag": 11.5 }
//!   ]
//! }
//! ```
//!
//! Layers are listed brightest first. Relative paths resolve against the
//! directory of the configuration file.

use crate::component::RetentionPolicy;
use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub retention: RetentionPolicy,
    /// Defaults to the brightest magnitude of the layer's table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trig_mag: Option<f32>,
}

impl LayerConfig {
    pub fn new(path: impl Into<PathBuf>, retention: RetentionPolicy) -> Self {
        Self {
            path: path.into(),
            retention,
            trig_mag: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    pub layers: Vec<LayerConfig>,
}

impl CatalogConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CatalogError::config(e.to_string()))
    }

    /// Reads a configuration file and resolves its relative layer paths.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| CatalogError::open(path, e))?;
        let mut config: Self = serde_json::from_str(&json)
            .map_err(|e| CatalogError::config(format!("{}: {}", path.display(), e)))?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Makes relative layer paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for layer in &mut self.layers {
            if layer.path.is_relative() {
                layer.path = base.join(&layer.path);
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CatalogError::config(e.to_string()))
    }
}
