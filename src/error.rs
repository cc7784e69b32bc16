//! Error taxonomy for the layout compiler.
//!
//! Hard failures are `CompileError` values. Recoverable problems (dropped variants,
//! unmatched slots) are reported as warnings on the result types instead.

use thiserror::Error;

use crate::repair::GeneratorError;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The IR has the wrong shape at `path`. Blocks the affected subtree only.
    #[error("Structural error at {path}: {message}")]
    Structural { path: String, message: String },

    /// A component identifier could not be resolved to a live component.
    #[error("Component not found: {component_id}")]
    ComponentNotFound { component_id: String },

    /// Font could not be loaded by the host.
    #[error("Failed to load font {family} {style}: {message}")]
    FontLoad {
        family: String,
        style: String,
        message: String,
    },

    /// The design host rejected an operation.
    #[error("Host error: {0}")]
    Host(String),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::Structural {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn component_not_found(component_id: impl Into<String>) -> Self {
        CompileError::ComponentNotFound {
            component_id: component_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Critical and high issues block a valid verdict.
    pub fn is_blocking(self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}
