//! Error types for the code runner.

use thiserror::Error;

/// Errors that can occur while processing a run request.
///
/// Only [`RunnerError::Decode`] escapes [`CodeRunner::process`] as an `Err`;
/// every other variant is a fault that gets folded into the response.
///
/// [`CodeRunner::process`]: crate::CodeRunner::process
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The request envelope was not valid JSON for the expected shape.
    #[error("invalid request envelope: {0}")]
    Decode(#[from] serde_json::Error),

    /// The module bytes could not be loaded as a component.
    #[error("failed to load module: {0}")]
    Load(String),

    /// No static entry function was found.
    #[error("error: Program does not contain a static '{0}' method suitable for an entry point")]
    NoEntryPoint(String),

    /// More than one static entry function was found.
    #[error("error: Program has more than one entry point defined: {}", .0.join(", "))]
    AmbiguousEntryPoint(Vec<String>),

    /// The module imports something the host does not provide.
    #[error("Missing type `{0}`")]
    MissingType(String),

    /// The entry function takes parameters other than strings.
    #[error("unsupported entry point signature `{entry}({params})`: only string parameters or a single list<string> can be bound")]
    UnsupportedSignature { entry: String, params: String },

    /// A non-nullable string parameter had no value to bind.
    #[error("Value cannot be null. (Parameter '{0}')")]
    NullArgument(String),

    /// The guest trapped or a host call failed during execution.
    #[error("{0}")]
    Guest(String),

    /// The wasm engine could not be created.
    #[error("engine error: {0}")]
    Engine(String),
}

impl RunnerError {
    /// Whether this fault is reported as program output rather than as a
    /// runner exception, the way a compiler reports a missing entry point.
    pub fn is_entry_point_error(&self) -> bool {
        matches!(
            self,
            RunnerError::NoEntryPoint(_) | RunnerError::AmbiguousEntryPoint(_)
        )
    }
}

/// Result type alias for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
