//! Submission and execution error types.

use thiserror::Error;

/// Errors raised while handing a plan to an engine.
///
/// Submission errors are synchronous: the plan never started running.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The execution target could not be reached.
    #[error("Execution target unreachable: {0}")]
    TargetUnreachable(String),

    /// The engine refused the plan.
    #[error("Plan rejected by engine: {0}")]
    Rejected(String),
}

/// Errors raised while a submitted job was running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// A user function returned an error. The operator name locates the
    /// failing transform in the plan.
    #[error("User function failed in operator '{operator}': {cause}")]
    UserFunction {
        /// Name of the operator whose user function failed.
        operator: String,
        /// The error the user function reported.
        cause: String,
    },

    /// The engine itself failed.
    #[error("Engine failure: {0}")]
    Engine(String),

    /// The engine dropped the job without reporting an outcome.
    #[error("Job outcome channel closed before a result was reported")]
    Disconnected,
}
