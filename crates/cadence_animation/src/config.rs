//! Cadence configuration file handling
//!
//! Scheduler and array-layout defaults, read from TOML:
//!
//! ```toml
//! [runner]
//! time_scale = 1.0
//! max_delta_time = 0.1
//!
//! [array]
//! as_array = true
//! fill = "random"
//! count = 12
//! columns = 4
//! seed = 7
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::array::{FillOrder, LayoutDirection};
use crate::error::{CadenceError, Result};

/// Top-level configuration (cadence.toml)
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CadenceConfig {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub array: ArrayConfig,
}

/// Frame driver settings for a [`TweenRunner`](crate::TweenRunner)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Global time scale applied by `advance`
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    /// Cap on a single frame's delta time
    #[serde(default)]
    pub max_delta_time: Option<f32>,
}

fn default_time_scale() -> f32 {
    1.0
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            max_delta_time: None,
        }
    }
}

/// Grid layout and stagger settings for an array animation
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ArrayConfig {
    /// Expand the animation into a grid of staggered members
    #[serde(default)]
    pub as_array: bool,
    /// Horizontal direction (driven by the column)
    #[serde(default)]
    pub row_layout: LayoutDirection,
    /// Vertical direction (driven by the row)
    #[serde(default)]
    pub col_layout: LayoutDirection,
    #[serde(default)]
    pub fill: FillOrder,
    /// Number of clones in template mode
    #[serde(default = "default_count")]
    pub count: usize,
    /// Start offset between successive members, in seconds
    #[serde(default = "default_interval")]
    pub interval: f32,
    #[serde(default = "default_extent")]
    pub columns: usize,
    #[serde(default = "default_extent")]
    pub rows: usize,
    /// Animate a caller-supplied member list instead of cloning
    #[serde(default)]
    pub use_specify: bool,
    /// With random fill, also pick axis directions at random
    #[serde(default)]
    pub randomize_directions: bool,
    /// Fixed seed for random fill; a fresh seed is drawn per build when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_count() -> usize {
    1
}

fn default_interval() -> f32 {
    0.1
}

fn default_extent() -> usize {
    1
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            as_array: false,
            row_layout: LayoutDirection::default(),
            col_layout: LayoutDirection::default(),
            fill: FillOrder::default(),
            count: default_count(),
            interval: default_interval(),
            columns: default_extent(),
            rows: default_extent(),
            use_specify: false,
            randomize_directions: false,
            seed: None,
        }
    }
}

impl CadenceConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file, or from `cadence.toml` inside a directory
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join("cadence.toml")
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&config_path).map_err(|source| {
            CadenceError::ConfigRead {
                path: config_path.clone(),
                source,
            }
        })?;

        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
