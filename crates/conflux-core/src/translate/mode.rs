//! Execution mode detection.
//!
//! The mode is derived once, before any other translation step, because
//! operator translation strategy differs by mode (a fixed-window assignment
//! compiles to a continuous windowing operator in streaming mode and to a
//! discrete grouping-by-window-key in batch mode). It is never reconsidered
//! mid-translation.

use crate::graph::PipelineGraph;

/// How the engine will execute the translated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// At least one collection is unbounded; the job runs indefinitely.
    Streaming,
    /// All collections are bounded; the job runs to completion.
    Batch,
}

impl ExecutionMode {
    /// Returns whether this is the streaming mode.
    #[must_use]
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::Streaming)
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Streaming => write!(f, "STREAMING"),
            Self::Batch => write!(f, "BATCH"),
        }
    }
}

/// Detects the execution mode of a pipeline graph.
///
/// A single side-effect-free pass over the edges: `Streaming` iff at least
/// one collection is unbounded. An empty graph is `Batch`.
#[must_use]
pub fn detect(graph: &PipelineGraph) -> ExecutionMode {
    if graph.has_unbounded_edge() {
        ExecutionMode::Streaming
    } else {
        ExecutionMode::Batch
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::element::Element;
    use crate::graph::{CollectionSpec, TransformKind};

    fn source() -> TransformKind {
        TransformKind::Source {
            factory: Arc::new(|| Box::new(std::iter::empty())),
        }
    }

    fn sink() -> TransformKind {
        TransformKind::Sink {
            writer: Arc::new(|_: &[Element]| Ok(())),
            windowed: false,
            num_shards: None,
        }
    }

    #[test]
    fn empty_graph_is_batch() {
        let graph = PipelineGraph::new();
        assert_eq!(detect(&graph), ExecutionMode::Batch);
    }

    #[test]
    fn all_bounded_is_batch() {
        let mut g = PipelineGraph::new();
        let a = g.add_node("a", source()).unwrap();
        let b = g.add_node("b", sink()).unwrap();
        g.add_edge(a, b, CollectionSpec::bounded()).unwrap();
        assert_eq!(detect(&g), ExecutionMode::Batch);
        assert!(!detect(&g).is_streaming());
    }

    #[test]
    fn single_unbounded_edge_is_streaming() {
        let mut g = PipelineGraph::new();
        let a = g.add_node("a", source()).unwrap();
        let b = g.add_node("b", source()).unwrap();
        let gbk = g.add_node("gbk", TransformKind::GroupByKey).unwrap();
        let out = g.add_node("out", sink()).unwrap();
        g.add_edge(a, gbk, CollectionSpec::bounded()).unwrap();
        g.add_edge(b, gbk, CollectionSpec::unbounded()).unwrap();
        g.add_edge(gbk, out, CollectionSpec::unbounded()).unwrap();
        assert_eq!(detect(&g), ExecutionMode::Streaming);
    }

    #[test]
    fn mode_display() {
        assert_eq!(ExecutionMode::Streaming.to_string(), "STREAMING");
        assert_eq!(ExecutionMode::Batch.to_string(), "BATCH");
    }
}
