//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gc::DEFAULT_GC_THRESHOLD;

/// Environment variable overriding `gc_threshold`.
pub const GC_THRESHOLD_ENV: &str = "GC_THRESHOLD";

/// Default cap on slots per object: what fits in 24 bits.
pub const DEFAULT_MAX_PROPERTY_SLOTS: u32 = 1 << 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Net allocations between automatic collections; 0 disables them.
    pub gc_threshold: usize,
    /// Live shape nodes allowed at once; `None` for no limit.
    pub max_heap_objects: Option<usize>,
    pub max_property_slots: u32,
    /// Whether `collect_garbage` drops property maps of tree shapes.
    pub release_property_maps: bool,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            max_heap_objects: None,
            max_property_slots: DEFAULT_MAX_PROPERTY_SLOTS,
            release_property_maps: true,
        }
    }
}

impl ShapeConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `GC_THRESHOLD` if it is set to a valid number.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(threshold) = std::env::var(GC_THRESHOLD_ENV)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            self.gc_threshold = threshold;
        }
        self
    }
}
