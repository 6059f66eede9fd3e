//! The engine-native operator graph produced by translation.
//!
//! Operators are the concrete runtime units an engine schedules. The graph
//! mirrors the logical pipeline's connectivity but speaks the engine's
//! vocabulary: readers, processors, window assigners, keyed groupers, and
//! shard writers, each specialized for the detected execution mode.

use std::fmt;

use smallvec::SmallVec;

use crate::element::{DoFn, OpaqueFn, SinkWriter, SourceFactory};
use crate::graph::WindowingStrategy;

/// Unique identifier for an operator in the translated graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpId(pub u32);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpId({})", self.0)
    }
}

/// The native operator vocabulary.
#[derive(Clone)]
pub enum OperatorKind {
    /// Reads a finite collection to completion.
    BoundedSource {
        /// Opaque element iterator factory.
        factory: SourceFactory,
    },
    /// Reads an unbounded collection; relies on engine checkpointing for
    /// replay after failure.
    UnboundedSource {
        /// Opaque element iterator factory.
        factory: SourceFactory,
    },
    /// Applies a user function per element.
    Process {
        /// Opaque user function, executed only by the engine.
        func: DoFn,
    },
    /// Streaming windowing runtime: tags each element with the window(s)
    /// it belongs to as it flows past.
    ContinuousWindowAssign {
        /// The windowing strategy being applied.
        strategy: WindowingStrategy,
    },
    /// Batch windowing runtime: derives a discrete window grouping key for
    /// each element in a single pass.
    WindowKeyAssign {
        /// The windowing strategy being applied.
        strategy: WindowingStrategy,
    },
    /// Groups by (key, window), emitting one group per pair when the
    /// window's trigger fires.
    KeyedWindowGroup {
        /// Windowing strategy of the grouped collection.
        strategy: WindowingStrategy,
        /// In batch mode there is exactly one closing pass over the data.
        single_pass: bool,
    },
    /// Buffers panes of a windowed sink until their window closes.
    PaneBuffer {
        /// Windowing strategy of the buffered collection.
        strategy: WindowingStrategy,
    },
    /// Writes finalized panes to the external sink.
    ShardWriter {
        /// Opaque sink writer.
        writer: SinkWriter,
        /// Number of output shards.
        num_shards: u32,
        /// Whether a shard may only be materialized once its window closes.
        finalize_on_close: bool,
    },
}

impl OperatorKind {
    /// Returns the operator kind name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::BoundedSource { .. } => "BoundedSource",
            Self::UnboundedSource { .. } => "UnboundedSource",
            Self::Process { .. } => "Process",
            Self::ContinuousWindowAssign { .. } => "ContinuousWindowAssign",
            Self::WindowKeyAssign { .. } => "WindowKeyAssign",
            Self::KeyedWindowGroup { .. } => "KeyedWindowGroup",
            Self::PaneBuffer { .. } => "PaneBuffer",
            Self::ShardWriter { .. } => "ShardWriter",
        }
    }
}

// Closures cannot derive Debug; render them as placeholders so operator
// dumps stay readable.
impl fmt::Debug for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundedSource { .. } => {
                f.debug_struct("BoundedSource").field("factory", &OpaqueFn).finish()
            }
            Self::UnboundedSource { .. } => {
                f.debug_struct("UnboundedSource").field("factory", &OpaqueFn).finish()
            }
            Self::Process { .. } => f.debug_struct("Process").field("func", &OpaqueFn).finish(),
            Self::ContinuousWindowAssign { strategy } => f
                .debug_struct("ContinuousWindowAssign")
                .field("strategy", strategy)
                .finish(),
            Self::WindowKeyAssign { strategy } => f
                .debug_struct("WindowKeyAssign")
                .field("strategy", strategy)
                .finish(),
            Self::KeyedWindowGroup {
                strategy,
                single_pass,
            } => f
                .debug_struct("KeyedWindowGroup")
                .field("strategy", strategy)
                .field("single_pass", single_pass)
                .finish(),
            Self::PaneBuffer { strategy } => {
                f.debug_struct("PaneBuffer").field("strategy", strategy).finish()
            }
            Self::ShardWriter {
                num_shards,
                finalize_on_close,
                ..
            } => f
                .debug_struct("ShardWriter")
                .field("writer", &OpaqueFn)
                .field("num_shards", num_shards)
                .field("finalize_on_close", finalize_on_close)
                .finish(),
        }
    }
}

/// A single operator in the translated graph.
#[derive(Debug, Clone)]
pub struct OperatorNode {
    /// Operator identifier; also its position in translation order.
    pub id: OpId,
    /// Name inherited from the logical transform.
    pub name: String,
    /// The operator's runtime behavior.
    pub kind: OperatorKind,
    /// Upstream operators, in input-port order.
    pub inputs: SmallVec<[OpId; 4]>,
    /// Downstream operators, in output-port order.
    pub outputs: SmallVec<[OpId; 4]>,
}

/// The translated, engine-native operator graph.
///
/// Operators are stored in translation order, which is a topological order
/// of the logical graph; an operator's inputs always precede it.
#[derive(Debug, Clone, Default)]
pub struct OperatorGraph {
    nodes: Vec<OperatorNode>,
    edges: Vec<(OpId, OpId)>,
}

impl OperatorGraph {
    /// Creates an empty operator graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operator and returns its identifier.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_operator(&mut self, name: impl Into<String>, kind: OperatorKind) -> OpId {
        let id = OpId(self.nodes.len() as u32);
        self.nodes.push(OperatorNode {
            id,
            name: name.into(),
            kind,
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
        });
        id
    }

    /// Connects two operators, appending to their port lists in call order.
    pub fn connect(&mut self, from: OpId, to: OpId) {
        self.edges.push((from, to));
        if let Some(node) = self.nodes.get_mut(from.0 as usize) {
            node.outputs.push(to);
        }
        if let Some(node) = self.nodes.get_mut(to.0 as usize) {
            node.inputs.push(from);
        }
    }

    /// Returns all operators in translation order.
    #[must_use]
    pub fn operators(&self) -> &[OperatorNode] {
        &self.nodes
    }

    /// Returns an operator by ID.
    #[must_use]
    pub fn operator(&self, id: OpId) -> Option<&OperatorNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Returns all wiring edges in creation order.
    #[must_use]
    pub fn edges(&self) -> &[(OpId, OpId)] {
        &self.edges
    }

    /// Returns the number of operators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the graph has no operators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Computes a structural fingerprint of the graph.
    ///
    /// Two graphs with the same operator kinds, parameters, names, and
    /// wiring produce the same fingerprint; it deliberately ignores
    /// anything identity-based, so it is the right equality for the
    /// determinism contract (topological equivalence, not byte identity).
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut canon = String::new();
        for node in &self.nodes {
            canon.push_str(&format!("{}:{}:{:?};", node.id, node.name, node.kind));
        }
        for (from, to) in &self.edges {
            canon.push_str(&format!("{from}->{to};"));
        }
        fxhash::hash64(canon.as_bytes())
    }
}
