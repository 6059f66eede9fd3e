//! Pipeline graph data structures.
//!
//! Defines `TransformNode`, `Collection` edges, and `PipelineGraph` with
//! topological ordering, cycle detection, and structural validation. The
//! graph is built by the pipeline-construction API, finalized once, and
//! handed to translation read-only.

use std::collections::VecDeque;
use std::fmt;

use arrow_schema::SchemaRef;
use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::error::GraphError;
use super::window::WindowingStrategy;
use crate::element::{DoFn, OpaqueFn, SinkWriter, SourceFactory};

/// Unique identifier for a transform node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Unique identifier for a collection edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// The finite set of transform kinds a node can apply.
///
/// `Composite` is the only non-primitive kind; it expands into a chain of
/// primitives before translation, which only ever sees primitive nodes.
/// User logic (`DoFn`, `SourceFactory`, `SinkWriter`) is carried as opaque
/// data and never invoked by the core.
#[derive(Clone)]
pub enum TransformKind {
    /// Reads elements from an external source.
    Source {
        /// Opaque factory producing the element iterator at execution time.
        factory: SourceFactory,
    },
    /// Applies a per-element function, emitting zero or more elements each.
    ParDo {
        /// Opaque user function, executed only by the engine.
        func: DoFn,
    },
    /// Re-windows the collection under a new windowing strategy.
    WindowInto {
        /// The strategy every output edge of this node must carry.
        strategy: WindowingStrategy,
    },
    /// Groups elements by key and window, emitting one group per
    /// (key, window) pair when the window's trigger fires.
    GroupByKey,
    /// Writes elements to an external sink.
    Sink {
        /// Opaque writer, invoked by the engine once per finalized pane.
        writer: SinkWriter,
        /// Whether output is partitioned by window (windowed writes).
        windowed: bool,
        /// Fixed shard count; `None` lets the engine choose.
        num_shards: Option<u32>,
    },
    /// A named chain of transforms, expanded before translation.
    Composite {
        /// The stages to splice in, first to last.
        stages: Vec<TransformKind>,
    },
}

impl TransformKind {
    /// Returns the kind name used in error messages and plan fingerprints.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Source { .. } => "Source",
            Self::ParDo { .. } => "ParDo",
            Self::WindowInto { .. } => "WindowInto",
            Self::GroupByKey => "GroupByKey",
            Self::Sink { .. } => "Sink",
            Self::Composite { .. } => "Composite",
        }
    }

    /// Returns whether this kind is primitive (non-composite).
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Composite { .. })
    }
}

impl fmt::Debug for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source { .. } => f.debug_struct("Source").field("factory", &OpaqueFn).finish(),
            Self::ParDo { .. } => f.debug_struct("ParDo").field("func", &OpaqueFn).finish(),
            Self::WindowInto { strategy } => {
                f.debug_struct("WindowInto").field("strategy", strategy).finish()
            }
            Self::GroupByKey => write!(f, "GroupByKey"),
            Self::Sink {
                windowed,
                num_shards,
                ..
            } => f
                .debug_struct("Sink")
                .field("writer", &OpaqueFn)
                .field("windowed", windowed)
                .field("num_shards", num_shards)
                .finish(),
            Self::Composite { stages } => f
                .debug_struct("Composite")
                .field("stages", &stages.len())
                .finish(),
        }
    }
}

/// A node in the pipeline graph: one transform application.
///
/// Nodes are created during graph construction and are immutable once the
/// graph is finalized.
#[derive(Debug)]
pub struct TransformNode {
    /// Unique node identifier.
    pub id: NodeId,
    /// Human-readable name (e.g. "parse", "hourly-counts").
    pub name: String,
    /// Input collections, in application order. `SmallVec` avoids heap
    /// allocation for <= 4 inputs.
    pub inputs: SmallVec<[EdgeId; 4]>,
    /// Output collections, in application order.
    pub outputs: SmallVec<[EdgeId; 4]>,
    /// The transform this node applies.
    pub kind: TransformKind,
}

/// Attributes of a collection edge, fixed at construction.
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    /// Whether the collection has a known finite end.
    pub bounded: bool,
    /// The windowing policy, set exactly once and immutable thereafter.
    pub windowing: WindowingStrategy,
    /// Element schema for downstream compatibility checks. An empty schema
    /// is type-erased and compatible with anything.
    pub schema: SchemaRef,
}

impl Default for CollectionSpec {
    fn default() -> Self {
        Self {
            bounded: true,
            windowing: WindowingStrategy::global(),
            schema: std::sync::Arc::new(arrow_schema::Schema::empty()),
        }
    }
}

impl CollectionSpec {
    /// A bounded, globally windowed, type-erased collection.
    #[must_use]
    pub fn bounded() -> Self {
        Self::default()
    }

    /// An unbounded, globally windowed, type-erased collection.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            bounded: false,
            ..Self::default()
        }
    }

    /// Sets the windowing strategy.
    #[must_use]
    pub fn with_windowing(mut self, windowing: WindowingStrategy) -> Self {
        self.windowing = windowing;
        self
    }

    /// Sets the element schema.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaRef) -> Self {
        self.schema = schema;
        self
    }
}

/// A collection edge: the logical collection flowing between two transforms.
#[derive(Debug)]
pub struct Collection {
    /// Unique edge identifier.
    pub id: EdgeId,
    /// Producing node.
    pub source: NodeId,
    /// Consuming node.
    pub target: NodeId,
    /// Collection attributes (boundedness, windowing, schema).
    pub spec: CollectionSpec,
    /// Output port on the producing node.
    pub source_port: u8,
    /// Input port on the consuming node.
    pub target_port: u8,
}

/// The complete pipeline graph.
///
/// Built once via `add_node`/`add_edge`, then `finalize`d, which validates
/// the topology and computes the deterministic execution order used by
/// translation.
pub struct PipelineGraph {
    /// All nodes, keyed by `NodeId`.
    nodes: FxHashMap<NodeId, TransformNode>,
    /// All edges, keyed by `EdgeId`.
    edges: FxHashMap<EdgeId, Collection>,
    /// Topologically sorted order (dependencies first), via Kahn's
    /// algorithm with `NodeId` tie-breaking for determinism.
    execution_order: Vec<NodeId>,
    /// Nodes with no inputs.
    source_nodes: Vec<NodeId>,
    /// Nodes with no outputs.
    sink_nodes: Vec<NodeId>,
    /// Name -> `NodeId` index for lookups.
    name_index: FxHashMap<String, NodeId>,
    /// Next node ID counter.
    next_node_id: u32,
    /// Next edge ID counter.
    next_edge_id: u32,
    /// Whether the graph has been finalized.
    finalized: bool,
}

impl fmt::Debug for PipelineGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineGraph")
            .field("node_count", &self.nodes.len())
            .field("edge_count", &self.edges.len())
            .field("source_nodes", &self.source_nodes)
            .field("sink_nodes", &self.sink_nodes)
            .field("execution_order", &self.execution_order)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

impl PipelineGraph {
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            execution_order: Vec::new(),
            source_nodes: Vec::new(),
            sink_nodes: Vec::new(),
            name_index: FxHashMap::default(),
            next_node_id: 0,
            next_edge_id: 0,
            finalized: false,
        }
    }

    /// Adds a transform node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::DuplicateNode` if a node with the same name
    /// exists.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        kind: TransformKind,
    ) -> Result<NodeId, GraphError> {
        let name = name.into();
        if self.name_index.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }

        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        let node = TransformNode {
            id,
            name: name.clone(),
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            kind,
        };

        self.nodes.insert(id, node);
        self.name_index.insert(name, id);
        self.finalized = false;

        Ok(id)
    }

    /// Adds a collection edge between two nodes.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if either node does not exist.
    /// Returns `GraphError::CycleDetected` if the edge would be a self-loop.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        spec: CollectionSpec,
    ) -> Result<EdgeId, GraphError> {
        if source == target {
            let name = self.node_name(source).unwrap_or_default();
            return Err(GraphError::CycleDetected(name));
        }

        if !self.nodes.contains_key(&source) {
            return Err(GraphError::NodeNotFound(format!("{source}")));
        }
        if !self.nodes.contains_key(&target) {
            return Err(GraphError::NodeNotFound(format!("{target}")));
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;

        // Port indices are bounded by practical fan-in/out, truncation is safe.
        #[allow(clippy::cast_possible_truncation)]
        let source_port = self.nodes.get(&source).map_or(0, |n| n.outputs.len() as u8);
        #[allow(clippy::cast_possible_truncation)]
        let target_port = self.nodes.get(&target).map_or(0, |n| n.inputs.len() as u8);

        let edge = Collection {
            id,
            source,
            target,
            spec,
            source_port,
            target_port,
        };

        self.edges.insert(id, edge);

        if let Some(node) = self.nodes.get_mut(&source) {
            node.outputs.push(id);
        }
        if let Some(node) = self.nodes.get_mut(&target) {
            node.inputs.push(id);
        }

        self.finalized = false;

        Ok(id)
    }

    /// Finalizes the graph: validates the topology and computes the
    /// deterministic execution order.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::EmptyGraph` if there are no nodes,
    /// `GraphError::CycleDetected` on cycles,
    /// `GraphError::DisconnectedNode` for nodes missing required
    /// connectivity, `GraphError::SchemaMismatch` for incompatible fan-in
    /// schemas, `GraphError::BoundednessMismatch` when a bounded collection
    /// is derived from an unbounded one, and `GraphError::InvalidWindowing`
    /// for degenerate windowing parameters.
    pub fn finalize(&mut self) -> Result<(), GraphError> {
        self.validate()?;
        self.compute_execution_order()?;
        self.classify_source_sink_nodes();
        self.finalized = true;
        Ok(())
    }

    /// Validates the graph topology without modifying internal state.
    ///
    /// # Errors
    ///
    /// Same conditions as [`PipelineGraph::finalize`].
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }
        self.check_acyclic()?;
        self.check_connected()?;
        self.check_windowing()?;
        self.check_boundedness()?;
        self.check_schemas()?;
        Ok(())
    }

    // ---- Accessors ----

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns a node by ID.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TransformNode> {
        self.nodes.get(&id)
    }

    /// Returns an edge by ID.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Collection> {
        self.edges.get(&id)
    }

    /// Returns all nodes.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeId, TransformNode> {
        &self.nodes
    }

    /// Returns all edges.
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<EdgeId, Collection> {
        &self.edges
    }

    /// Returns the `NodeId` for a node name.
    #[must_use]
    pub fn node_id_by_name(&self, name: &str) -> Option<NodeId> {
        self.name_index.get(name).copied()
    }

    /// Returns the node name for a `NodeId`.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<String> {
        self.nodes.get(&id).map(|n| n.name.clone())
    }

    /// Returns all source nodes (no inputs), sorted by ID.
    #[must_use]
    pub fn sources(&self) -> &[NodeId] {
        &self.source_nodes
    }

    /// Returns all sink nodes (no outputs), sorted by ID.
    #[must_use]
    pub fn sinks(&self) -> &[NodeId] {
        &self.sink_nodes
    }

    /// Returns nodes in topological execution order (dependencies first).
    #[must_use]
    pub fn execution_order(&self) -> &[NodeId] {
        &self.execution_order
    }

    /// Returns whether the graph has been finalized.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Returns whether any node is a composite.
    #[must_use]
    pub fn has_composites(&self) -> bool {
        self.nodes
            .values()
            .any(|n| !n.kind.is_primitive())
    }

    /// Returns whether any edge carries an unbounded collection.
    #[must_use]
    pub fn has_unbounded_edge(&self) -> bool {
        self.edges.values().any(|e| !e.spec.bounded)
    }

    // ---- Internal validation methods ----

    /// Checks that the graph is acyclic using Kahn's algorithm.
    ///
    /// If the topological order covers fewer nodes than the graph holds, a
    /// cycle exists.
    fn check_acyclic(&self) -> Result<(), GraphError> {
        let (order, _) = self.kahn_topo_sort();
        if order.len() < self.nodes.len() {
            let ordered_set: FxHashSet<NodeId> = order.into_iter().collect();
            for node in self.nodes.values() {
                if !ordered_set.contains(&node.id) {
                    return Err(GraphError::CycleDetected(node.name.clone()));
                }
            }
            return Err(GraphError::CycleDetected("unknown".to_string()));
        }
        Ok(())
    }

    /// Checks per-kind connectivity: sources feed something, sinks consume
    /// something, and everything else has both inputs and outputs.
    fn check_connected(&self) -> Result<(), GraphError> {
        for node in self.nodes.values() {
            match node.kind {
                TransformKind::Source { .. } => {
                    if node.outputs.is_empty() {
                        return Err(GraphError::DisconnectedNode(node.name.clone()));
                    }
                    if !node.inputs.is_empty() {
                        return Err(GraphError::Malformed {
                            node: node.name.clone(),
                            reason: "source nodes take no inputs".to_string(),
                        });
                    }
                }
                TransformKind::Sink { .. } => {
                    if node.inputs.is_empty() {
                        return Err(GraphError::DisconnectedNode(node.name.clone()));
                    }
                    if !node.outputs.is_empty() {
                        return Err(GraphError::Malformed {
                            node: node.name.clone(),
                            reason: "sink nodes produce no outputs".to_string(),
                        });
                    }
                }
                _ => {
                    if node.inputs.is_empty() || node.outputs.is_empty() {
                        return Err(GraphError::DisconnectedNode(node.name.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks windowing strategies for degenerate parameters.
    fn check_windowing(&self) -> Result<(), GraphError> {
        for edge in self.edges.values() {
            if let Err(reason) = edge.spec.windowing.check() {
                let node = self.node_name(edge.source).unwrap_or_default();
                return Err(GraphError::InvalidWindowing { node, reason });
            }
        }
        Ok(())
    }

    /// Checks that boundedness only flows forward: a node fed by any
    /// unbounded collection cannot produce a bounded one.
    fn check_boundedness(&self) -> Result<(), GraphError> {
        for node in self.nodes.values() {
            let unbounded_input = node
                .inputs
                .iter()
                .filter_map(|id| self.edges.get(id))
                .any(|e| !e.spec.bounded);
            if !unbounded_input {
                continue;
            }
            for edge in node.outputs.iter().filter_map(|id| self.edges.get(id)) {
                if edge.spec.bounded {
                    return Err(GraphError::BoundednessMismatch(node.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Validates schema compatibility where collections converge.
    ///
    /// All input edges of a node must agree on element schema; empty
    /// schemas are type-erased and compatible with anything.
    fn check_schemas(&self) -> Result<(), GraphError> {
        for node in self.nodes.values() {
            let mut first: Option<&Collection> = None;
            for edge in node.inputs.iter().filter_map(|id| self.edges.get(id)) {
                if edge.spec.schema.fields().is_empty() {
                    continue;
                }
                let Some(prev) = first else {
                    first = Some(edge);
                    continue;
                };
                if prev.spec.schema.fields() != edge.spec.schema.fields() {
                    return Err(GraphError::SchemaMismatch {
                        node: node.name.clone(),
                        reason: format!(
                            "input collections {} and {} carry different element schemas",
                            prev.id, edge.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Computes topological execution order using Kahn's algorithm.
    fn compute_execution_order(&mut self) -> Result<(), GraphError> {
        let (order, processed) = self.kahn_topo_sort();
        if processed < self.nodes.len() {
            let ordered_set: FxHashSet<NodeId> = order.iter().copied().collect();
            for node in self.nodes.values() {
                if !ordered_set.contains(&node.id) {
                    return Err(GraphError::CycleDetected(node.name.clone()));
                }
            }
            return Err(GraphError::CycleDetected("unknown".to_string()));
        }
        self.execution_order = order;
        Ok(())
    }

    /// Kahn's algorithm for topological sort.
    ///
    /// Returns `(ordered_node_ids, count_of_processed_nodes)`. Ready nodes
    /// are dequeued in `NodeId` order so the result is deterministic for a
    /// given graph.
    fn kahn_topo_sort(&self) -> (Vec<NodeId>, usize) {
        let mut in_degree: FxHashMap<NodeId, usize> = FxHashMap::default();
        for node in self.nodes.values() {
            in_degree.entry(node.id).or_insert(0);
        }
        for edge in self.edges.values() {
            *in_degree.entry(edge.target).or_insert(0) += 1;
        }

        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut initial: Vec<NodeId> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();
        initial.sort_by_key(|n| n.0);
        queue.extend(initial);

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut processed = 0;

        while let Some(node_id) = queue.pop_front() {
            order.push(node_id);
            processed += 1;

            if let Some(node) = self.nodes.get(&node_id) {
                let mut successors: Vec<NodeId> = Vec::new();
                for &edge_id in &node.outputs {
                    if let Some(edge) = self.edges.get(&edge_id) {
                        let target = edge.target;
                        if let Some(deg) = in_degree.get_mut(&target) {
                            *deg = deg.saturating_sub(1);
                            if *deg == 0 {
                                successors.push(target);
                            }
                        }
                    }
                }
                successors.sort_by_key(|n| n.0);
                queue.extend(successors);
            }
        }

        (order, processed)
    }

    /// Classifies source and sink nodes based on connectivity.
    fn classify_source_sink_nodes(&mut self) {
        self.source_nodes.clear();
        self.sink_nodes.clear();

        for node in self.nodes.values() {
            if node.inputs.is_empty() {
                self.source_nodes.push(node.id);
            }
            if node.outputs.is_empty() {
                self.sink_nodes.push(node.id);
            }
        }

        self.source_nodes.sort_by_key(|n| n.0);
        self.sink_nodes.sort_by_key(|n| n.0);
    }
}

impl Default for PipelineGraph {
    fn default() -> Self {
        Self::new()
    }
}
