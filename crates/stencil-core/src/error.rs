//! Error types for stencil-core.
//!
//! Every failure in the compile/cache/instantiate pipeline is terminal for
//! the operation that raised it; the core never retries. Callers that want
//! retry semantics (for example re-compiling after fixing a template) sit
//! above this crate.

use thiserror::Error;

use crate::compiler::{Diagnostic, Language};

/// Errors raised by the stencil pipeline.
#[derive(Debug, Error)]
pub enum StencilError {
    /// A required argument was missing or empty at a public entry point.
    #[error("invalid argument `{name}`: {message}")]
    InvalidArgument { name: &'static str, message: String },

    /// The requested language has no compiler backend.
    #[error("unsupported language: {language}")]
    UnsupportedLanguage { language: Language },

    /// The generated source did not compile. Carries the full, ordered
    /// diagnostic list; no artifact is produced or cached.
    #[error("template compilation failed:\n{}", format_diagnostics(diagnostics))]
    CompilationFailed { diagnostics: Vec<Diagnostic> },

    /// An operation was invoked on a component after it was disposed.
    #[error("{component} has been disposed")]
    Disposed { component: &'static str },

    /// A library or unit lookup failed inside the load context.
    #[error("could not resolve `{name}` in the load context")]
    ResolutionFailed { name: String },

    /// The compiled type exposes no parameterless constructor.
    #[error("type `{type_name}` has no parameterless constructor")]
    MissingConstructor { type_name: String },

    /// A required collaborator was missing or invalid at snapshot
    /// construction time.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// The template manager could not resolve the given key.
    #[error("no template found for key `{key}`")]
    TemplateNotFound { key: String },

    /// The load context has been unloaded; future lookups and loads fail.
    #[error("load context has been unloaded")]
    ContextUnloaded,

    /// A value error raised while executing a compiled template.
    #[error("template execution failed: {message}")]
    Execution { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StencilError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        StencilError::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        StencilError::Configuration {
            message: message.into(),
        }
    }

    /// Create an execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        StencilError::Execution {
            message: message.into(),
        }
    }

    /// The diagnostics carried by a compilation failure, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            StencilError::CompilationFailed { diagnostics } => diagnostics,
            _ => &[],
        }
    }
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for stencil operations.
pub type Result<T> = std::result::Result<T, StencilError>;
