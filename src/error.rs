//! Error types for shape operations

use thiserror::Error;

use crate::gc::AllocError;

/// Failures an operation reports instead of producing a shape.
///
/// The input shape is left untouched whenever one of these is returned.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("cannot add property: {requested} slots requested, at most {max} allowed")]
    SlotLimitExceeded { requested: u32, max: u32 },

    #[error("out of memory: {0}")]
    OutOfMemory(#[from] AllocError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl ShapeError {
    pub fn slot_limit(requested: u32, max: u32) -> Self {
        ShapeError::SlotLimitExceeded { requested, max }
    }

    /// True for failures caused by running out of heap or slots.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(
            self,
            ShapeError::SlotLimitExceeded { .. } | ShapeError::OutOfMemory(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShapeError>;
