//! Checkpoint durability policy.
//!
//! Unbounded sources rely on the engine's checkpointing to replay data
//! after a failure. Running a streaming pipeline with checkpointing
//! disabled is legal but risky, so translation emits an advisory
//! diagnostic with a fixed message external tooling can match on. The
//! check never aborts translation.

use crate::options::CheckpointConfig;
use crate::translate::mode::ExecutionMode;

/// The fixed advisory message emitted for streaming pipelines without
/// checkpointing. The exact text is load-bearing: external tooling matches
/// on it.
pub const CHECKPOINTING_DISABLED_WARNING: &str =
    "UnboundedSources present which rely on checkpointing, but checkpointing is disabled.";

/// Severity of a translation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Advisory; translation proceeds.
    Warning,
}

/// A structured diagnostic produced during translation.
///
/// Diagnostics are returned as values so callers and tests can subscribe
/// to them directly; they are also mirrored onto the `tracing` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Diagnostic severity.
    pub severity: Severity,
    /// Human-readable message. Stable for known policy checks.
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// Validates the checkpoint configuration against the detected mode.
///
/// Returns the checkpointing warning for streaming pipelines with
/// checkpointing disabled, and `None` otherwise. Idempotent: the decision
/// depends only on the mode and the flag, never on how many unbounded
/// sources exist. The warning is also written to the `tracing` stream at
/// `warn` level.
#[must_use]
pub fn validate(mode: ExecutionMode, checkpoint: &CheckpointConfig) -> Option<Diagnostic> {
    if mode.is_streaming() && !checkpoint.enabled {
        tracing::warn!("{CHECKPOINTING_DISABLED_WARNING}");
        return Some(Diagnostic {
            severity: Severity::Warning,
            message: CHECKPOINTING_DISABLED_WARNING.to_string(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn disabled() -> CheckpointConfig {
        CheckpointConfig::disabled()
    }

    fn enabled() -> CheckpointConfig {
        CheckpointConfig::enabled(Duration::from_secs(10))
    }

    #[test]
    fn streaming_without_checkpointing_warns_exact_message() {
        let diag = validate(ExecutionMode::Streaming, &disabled()).unwrap();
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(
            diag.message,
            "UnboundedSources present which rely on checkpointing, but checkpointing is disabled."
        );
    }

    #[test]
    fn streaming_with_checkpointing_is_silent() {
        assert!(validate(ExecutionMode::Streaming, &enabled()).is_none());
    }

    #[test]
    fn batch_never_warns() {
        assert!(validate(ExecutionMode::Batch, &disabled()).is_none());
        assert!(validate(ExecutionMode::Batch, &enabled()).is_none());
    }

    #[test]
    fn validation_is_idempotent() {
        let first = validate(ExecutionMode::Streaming, &disabled());
        let second = validate(ExecutionMode::Streaming, &disabled());
        assert_eq!(first, second);
    }
}
