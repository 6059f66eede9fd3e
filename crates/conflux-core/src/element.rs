//! The engine-facing record shape and the opaque user-logic seams.
//!
//! Per-element processing functions, source factories, and sink writers are
//! carried on graph nodes as data. The translation layer never invokes them;
//! only an execution engine does.

use std::fmt;
use std::sync::Arc;

/// A single record flowing through a pipeline.
///
/// Keys and values are opaque byte payloads; the core does not interpret
/// them. Timestamps are milliseconds since the epoch and drive window
/// assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Grouping key, if the element is keyed.
    pub key: Option<Vec<u8>>,
    /// Opaque value payload.
    pub value: Vec<u8>,
    /// Event timestamp in milliseconds since the epoch.
    pub timestamp: i64,
}

impl Element {
    /// Creates an unkeyed element.
    #[must_use]
    pub fn new(value: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        Self {
            key: None,
            value: value.into(),
            timestamp,
        }
    }

    /// Creates a keyed element.
    #[must_use]
    pub fn keyed(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
            timestamp,
        }
    }

    /// Returns a copy of this element carrying the given key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Error raised by user-supplied per-element logic during execution.
///
/// Surfaced by engines through `JobResult::Failed`; never raised during
/// translation, which does not evaluate user logic.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct DoFnError(pub String);

impl DoFnError {
    /// Creates an error from any displayable cause.
    #[must_use]
    pub fn new(cause: impl Into<String>) -> Self {
        Self(cause.into())
    }
}

/// An opaque per-element processing function.
///
/// Maps one input element to zero or more output elements. Carried as data
/// on `ParDo` nodes; the translator never calls it.
pub type DoFn = Arc<dyn Fn(Element) -> Result<Vec<Element>, DoFnError> + Send + Sync>;

/// An opaque source factory.
///
/// Produces a fresh element iterator each time the engine starts reading.
/// Whether the iterator terminates is *not* consulted for mode detection;
/// boundedness is an attribute of the output collection.
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn Iterator<Item = Element> + Send> + Send + Sync>;

/// An opaque sink writer, invoked by the engine once per finalized pane.
pub type SinkWriter = Arc<dyn Fn(&[Element]) -> Result<(), DoFnError> + Send + Sync>;

/// Wrapper used by node kinds so closures render in `Debug` output.
pub(crate) struct OpaqueFn;

impl fmt::Debug for OpaqueFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<user fn>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_constructors() {
        let e = Element::new(b"v".to_vec(), 100);
        assert!(e.key.is_none());
        assert_eq!(e.value, b"v");
        assert_eq!(e.timestamp, 100);

        let k = Element::keyed(b"k".to_vec(), b"v".to_vec(), 5);
        assert_eq!(k.key.as_deref(), Some(b"k".as_slice()));

        let rekeyed = e.with_key(b"k2".to_vec());
        assert_eq!(rekeyed.key.as_deref(), Some(b"k2".as_slice()));
    }

    #[test]
    fn do_fn_error_display() {
        let err = DoFnError::new("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
