//! Error types shared across the planning engine.
//!
//! Business gates (finalize's no-draft / already-finalized) are values in
//! the returned report, not errors. Everything else fails loudly with a
//! typed error so callers can map it to their transport.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// A referenced entity (task id, workspace) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Schema validation failed; carries every collected message.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The operation conflicts with current state (e.g. a focus session
    /// is already active).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A workspace file exists but could not be parsed as JSON/YAML.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PlannerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PlannerError::Validation(vec![msg.into()])
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
