//! Error types for pipeline graph operations.

/// Errors that can occur during graph construction and validation.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph contains a cycle involving the named node.
    #[error("cycle detected involving node: {0}")]
    CycleDetected(String),

    /// A node is missing required connectivity for its kind.
    #[error("disconnected node: {0}")]
    DisconnectedNode(String),

    /// An edge references a node that does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A node with the same name already exists.
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    /// A node's wiring contradicts its kind.
    #[error("malformed node '{node}': {reason}")]
    Malformed {
        /// Node name.
        node: String,
        /// Description of the problem.
        reason: String,
    },

    /// Input collections converging on a node carry incompatible schemas.
    #[error("schema mismatch at node '{node}': {reason}")]
    SchemaMismatch {
        /// Node name.
        node: String,
        /// Description of the incompatibility.
        reason: String,
    },

    /// A bounded collection is derived from an unbounded one.
    #[error("boundedness mismatch: node '{0}' derives a bounded collection from an unbounded input")]
    BoundednessMismatch(String),

    /// A windowing strategy has degenerate parameters.
    #[error("invalid windowing on output of node '{node}': {reason}")]
    InvalidWindowing {
        /// Producing node name.
        node: String,
        /// Description of the problem.
        reason: String,
    },

    /// A composite node cannot be expanded.
    #[error("invalid composite '{node}': {reason}")]
    InvalidComposite {
        /// Composite node name.
        node: String,
        /// Description of the problem.
        reason: String,
    },

    /// The graph has no nodes.
    #[error("empty graph: no nodes")]
    EmptyGraph,
}
