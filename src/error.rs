//! # Compiler Errors
//!
//! Fatal errors only. Structural and type problems are reported as diagnostics
//! and never surface here.

use thiserror::Error;

/// Errors that abort a compile or fail to load a contract value.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The connection graph contains a cycle, so no execution order exists.
    #[error("graph contains a cycle involving nodes: {}", remaining.join(", "))]
    CycleDetected { remaining: Vec<String> },

    /// A JSON contract value (graph, registry, config) failed to parse.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Compiler configuration is unusable.
    #[error("invalid compiler configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;
