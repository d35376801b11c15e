//! Error types for statement rendering

use thiserror::Error;

/// Rendering error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A variable was referenced where no clause binds it
    #[error("Unbound variable: {name}")]
    UnboundVariable { name: String },

    /// A fixed parameter name was bound to two different values
    #[error("Parameter collision: ${name} bound to conflicting values")]
    ParamCollision { name: String },

    /// Raw statement text uses a placeholder nothing is bound to
    #[error("Unbound parameter: ${name}")]
    UnboundParam { name: String },
}

/// Result type for rendering
pub type RenderResult<T> = Result<T, RenderError>;
