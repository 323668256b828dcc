use thiserror::Error;

/// Error types for skeleton validation and animation system setup
///
/// The per-tick simulation never produces these; it falls back to identity
/// values and skips entities instead. Errors are reserved for load-time
/// checks and configuration.
#[derive(Error, Debug)]
pub enum AnimError {
    /// A bone references a parent that is not stored before it
    #[error("Invalid bone hierarchy: bone {bone} has parent {parent}")]
    InvalidHierarchy { bone: usize, parent: usize },

    /// A sequence references a variation or alias outside the sequence table
    #[error("Invalid sequence reference: sequence {sequence} points at {target}")]
    InvalidSequenceReference { sequence: usize, target: usize },

    /// A channel is driven by a global loop the skeleton does not declare
    #[error("Invalid global loop: {owner} references loop {index}, skeleton has {count}")]
    InvalidGlobalLoop {
        owner: String,
        index: usize,
        count: usize,
    },

    /// Keyframe data that cannot be sampled
    #[error("Invalid track data: {0}")]
    InvalidTrack(String),

    /// An attachment or key bone targets a bone that does not exist
    #[error("Reference error: {0}")]
    ReferenceError(String),

    /// No free animation state slot is left on an instance
    #[error("State slot limit reached ({limit})")]
    StateSlotsExhausted { limit: usize },

    /// Configuration could not be loaded or applied
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type using AnimError
pub type Result<T> = std::result::Result<T, AnimError>;
