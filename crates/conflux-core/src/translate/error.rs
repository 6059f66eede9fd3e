//! Error types for transform translation.

/// Fatal translation errors.
///
/// Translation fails fast: the first malformed or unsupported node aborts
/// the walk before any plan is built, so partial plans are never submitted.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    /// The graph was not finalized before translation.
    #[error("graph must be finalized before translation")]
    UnfinalizedGraph,

    /// A composite node reached the translator; expansion is an upstream
    /// obligation.
    #[error("unexpanded composite node reached the translator: {0}")]
    UnexpandedComposite(String),

    /// A node's wiring or parameters contradict its kind.
    #[error("malformed node '{node}': {reason}")]
    MalformedNode {
        /// Node name.
        node: String,
        /// Description of the problem.
        reason: String,
    },

    /// A windowing-assignment node and its output collections disagree on
    /// the windowing strategy.
    #[error("inconsistent windowing at node '{node}': {reason}")]
    InconsistentWindowing {
        /// Node name.
        node: String,
        /// Description of the disagreement.
        reason: String,
    },

    /// A referenced node or edge is missing from the graph.
    #[error("dangling reference in graph: {0}")]
    DanglingReference(String),
}
