//! Transform-to-operator translation.
//!
//! Walks the finalized pipeline graph in topological order and maps each
//! primitive transform onto one or more native operators, specialized for
//! the detected execution mode and wired in the same order as the logical
//! edges. Translation never evaluates user logic and fails fast on the
//! first malformed node — a partial plan is never produced.

use fxhash::FxHashMap;

use super::error::TranslationError;
use super::mode::ExecutionMode;
use crate::graph::{NodeId, PipelineGraph, TransformKind, TransformNode, WindowingStrategy};
use crate::plan::{OpId, OperatorGraph, OperatorKind};

/// Translates a finalized, composite-free pipeline graph into the native
/// operator graph for the given mode.
///
/// # Errors
///
/// Returns [`TranslationError`] if the graph is not finalized, a composite
/// node was not expanded upstream, a node's wiring or parameters
/// contradict its kind, or windowing strategies disagree across a node's
/// collections.
pub fn translate(
    graph: &PipelineGraph,
    mode: ExecutionMode,
) -> Result<OperatorGraph, TranslationError> {
    if !graph.is_finalized() {
        return Err(TranslationError::UnfinalizedGraph);
    }

    let mut ops = OperatorGraph::new();
    // Entry/exit operator per logical node; they differ when a transform
    // expands to an operator chain.
    let mut entry: FxHashMap<NodeId, OpId> = FxHashMap::default();
    let mut exit: FxHashMap<NodeId, OpId> = FxHashMap::default();

    for &node_id in graph.execution_order() {
        let node = graph
            .node(node_id)
            .ok_or_else(|| TranslationError::DanglingReference(format!("{node_id}")))?;
        let (first, last) = translate_node(graph, node, mode, &mut ops)?;
        entry.insert(node_id, first);
        exit.insert(node_id, last);
    }

    // Wire operators following the logical edges. Nodes are visited in
    // execution order and inputs in port order, so wiring is deterministic.
    for &node_id in graph.execution_order() {
        let node = graph
            .node(node_id)
            .ok_or_else(|| TranslationError::DanglingReference(format!("{node_id}")))?;
        for &edge_id in &node.inputs {
            let edge = graph
                .edge(edge_id)
                .ok_or_else(|| TranslationError::DanglingReference(format!("{edge_id}")))?;
            let from = exit
                .get(&edge.source)
                .copied()
                .ok_or_else(|| TranslationError::DanglingReference(format!("{}", edge.source)))?;
            let to = entry
                .get(&node_id)
                .copied()
                .ok_or_else(|| TranslationError::DanglingReference(format!("{node_id}")))?;
            ops.connect(from, to);
        }
    }

    Ok(ops)
}

/// Translates one primitive node, appending its operators.
///
/// Returns the (entry, exit) operator pair for wiring.
fn translate_node(
    graph: &PipelineGraph,
    node: &TransformNode,
    mode: ExecutionMode,
    ops: &mut OperatorGraph,
) -> Result<(OpId, OpId), TranslationError> {
    match &node.kind {
        TransformKind::Composite { .. } => {
            Err(TranslationError::UnexpandedComposite(node.name.clone()))
        }

        TransformKind::Source { factory } => {
            if !node.inputs.is_empty() {
                return Err(malformed(node, "source nodes take no inputs"));
            }
            let bounded = output_boundedness(graph, node)?;
            let kind = if bounded {
                OperatorKind::BoundedSource {
                    factory: factory.clone(),
                }
            } else {
                OperatorKind::UnboundedSource {
                    factory: factory.clone(),
                }
            };
            let id = ops.add_operator(node.name.clone(), kind);
            Ok((id, id))
        }

        TransformKind::ParDo { func } => {
            if node.inputs.is_empty() {
                return Err(malformed(node, "per-element transform has no input collection"));
            }
            let id = ops.add_operator(
                node.name.clone(),
                OperatorKind::Process { func: func.clone() },
            );
            Ok((id, id))
        }

        TransformKind::WindowInto { strategy } => {
            if let Err(reason) = strategy.check() {
                return Err(malformed(node, &reason));
            }
            for edge in node.outputs.iter().filter_map(|id| graph.edge(*id)) {
                if edge.spec.windowing != *strategy {
                    return Err(TranslationError::InconsistentWindowing {
                        node: node.name.clone(),
                        reason: format!(
                            "output collection {} does not carry the assigned strategy",
                            edge.id
                        ),
                    });
                }
            }
            let kind = if mode.is_streaming() {
                OperatorKind::ContinuousWindowAssign {
                    strategy: *strategy,
                }
            } else {
                OperatorKind::WindowKeyAssign {
                    strategy: *strategy,
                }
            };
            let id = ops.add_operator(node.name.clone(), kind);
            Ok((id, id))
        }

        TransformKind::GroupByKey => {
            let strategy = input_windowing(graph, node)?;
            let id = ops.add_operator(
                node.name.clone(),
                OperatorKind::KeyedWindowGroup {
                    strategy,
                    single_pass: !mode.is_streaming(),
                },
            );
            Ok((id, id))
        }

        TransformKind::Sink {
            writer,
            windowed,
            num_shards,
        } => {
            if num_shards == &Some(0) {
                return Err(malformed(node, "shard count must be at least 1"));
            }
            let shards = num_shards.unwrap_or(1);

            // Windowed streaming sinks may only materialize a shard once
            // its window closes; a pane buffer holds the data until then.
            // In batch mode there is exactly one closing pass, so the
            // writer finalizes immediately after the computation completes.
            if *windowed && mode.is_streaming() {
                let strategy = input_windowing(graph, node)?;
                let buffer = ops.add_operator(
                    format!("{}/panes", node.name),
                    OperatorKind::PaneBuffer { strategy },
                );
                let writer_op = ops.add_operator(
                    node.name.clone(),
                    OperatorKind::ShardWriter {
                        writer: writer.clone(),
                        num_shards: shards,
                        finalize_on_close: true,
                    },
                );
                ops.connect(buffer, writer_op);
                Ok((buffer, writer_op))
            } else {
                let id = ops.add_operator(
                    node.name.clone(),
                    OperatorKind::ShardWriter {
                        writer: writer.clone(),
                        num_shards: shards,
                        finalize_on_close: false,
                    },
                );
                Ok((id, id))
            }
        }
    }
}

fn malformed(node: &TransformNode, reason: &str) -> TranslationError {
    TranslationError::MalformedNode {
        node: node.name.clone(),
        reason: reason.to_string(),
    }
}

/// Returns the boundedness of a source node's outputs, requiring all
/// output collections to agree.
fn output_boundedness(
    graph: &PipelineGraph,
    node: &TransformNode,
) -> Result<bool, TranslationError> {
    let mut bounded = None;
    for edge in node.outputs.iter().filter_map(|id| graph.edge(*id)) {
        match bounded {
            None => bounded = Some(edge.spec.bounded),
            Some(b) if b != edge.spec.bounded => {
                return Err(malformed(
                    node,
                    "source outputs disagree on boundedness",
                ));
            }
            Some(_) => {}
        }
    }
    bounded.ok_or_else(|| malformed(node, "source node has no output collection"))
}

/// Returns the windowing strategy of a node's inputs, requiring all input
/// collections to agree.
fn input_windowing(
    graph: &PipelineGraph,
    node: &TransformNode,
) -> Result<WindowingStrategy, TranslationError> {
    let mut strategy: Option<WindowingStrategy> = None;
    for edge in node.inputs.iter().filter_map(|id| graph.edge(*id)) {
        match strategy {
            None => strategy = Some(edge.spec.windowing),
            Some(s) if s != edge.spec.windowing => {
                return Err(TranslationError::InconsistentWindowing {
                    node: node.name.clone(),
                    reason: "input collections carry different windowing strategies"
                        .to_string(),
                });
            }
            Some(_) => {}
        }
    }
    strategy
        .ok_or_else(|| malformed(node, "node has no input collection to take windowing from"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::element::Element;
    use crate::graph::CollectionSpec;

    fn source() -> TransformKind {
        TransformKind::Source {
            factory: Arc::new(|| Box::new(std::iter::empty())),
        }
    }

    fn pardo() -> TransformKind {
        TransformKind::ParDo {
            func: Arc::new(|e: Element| Ok(vec![e])),
        }
    }

    fn sink(windowed: bool, num_shards: Option<u32>) -> TransformKind {
        TransformKind::Sink {
            writer: Arc::new(|_: &[Element]| Ok(())),
            windowed,
            num_shards,
        }
    }

    fn hourly() -> WindowingStrategy {
        WindowingStrategy::fixed(Duration::from_secs(3600))
    }

    /// source -> pardo -> window -> gbk -> sink, windowed writes.
    fn windowed_graph(bounded: bool) -> PipelineGraph {
        let spec = |windowing| {
            let base = if bounded {
                CollectionSpec::bounded()
            } else {
                CollectionSpec::unbounded()
            };
            base.with_windowing(windowing)
        };
        let mut g = PipelineGraph::new();
        let src = g.add_node("seq", source()).unwrap();
        let map = g.add_node("format", pardo()).unwrap();
        let win = g
            .add_node("hourly", TransformKind::WindowInto { strategy: hourly() })
            .unwrap();
        let gbk = g.add_node("gbk", TransformKind::GroupByKey).unwrap();
        let out = g.add_node("write", sink(true, Some(1))).unwrap();
        g.add_edge(src, map, spec(WindowingStrategy::global())).unwrap();
        g.add_edge(map, win, spec(WindowingStrategy::global())).unwrap();
        g.add_edge(win, gbk, spec(hourly())).unwrap();
        g.add_edge(gbk, out, spec(hourly())).unwrap();
        g.finalize().unwrap();
        g
    }

    fn kind_names(ops: &OperatorGraph) -> Vec<&'static str> {
        ops.operators().iter().map(|o| o.kind.name()).collect()
    }

    #[test]
    fn unfinalized_graph_rejected() {
        let mut g = PipelineGraph::new();
        g.add_node("src", source()).unwrap();
        let err = translate(&g, ExecutionMode::Batch).unwrap_err();
        assert!(matches!(err, TranslationError::UnfinalizedGraph));
    }

    #[test]
    fn streaming_translation_uses_continuous_windowing() {
        let g = windowed_graph(false);
        let ops = translate(&g, ExecutionMode::Streaming).unwrap();
        assert_eq!(
            kind_names(&ops),
            vec![
                "UnboundedSource",
                "Process",
                "ContinuousWindowAssign",
                "KeyedWindowGroup",
                "PaneBuffer",
                "ShardWriter",
            ]
        );

        // The windowed streaming sink expands to a pane buffer feeding a
        // close-finalizing writer.
        let writer = ops.operators().last().unwrap();
        match &writer.kind {
            OperatorKind::ShardWriter {
                num_shards,
                finalize_on_close,
                ..
            } => {
                assert_eq!(*num_shards, 1);
                assert!(finalize_on_close);
            }
            other => panic!("expected ShardWriter, got {other:?}"),
        }
    }

    #[test]
    fn batch_translation_uses_discrete_windowing() {
        let g = windowed_graph(true);
        let ops = translate(&g, ExecutionMode::Batch).unwrap();
        assert_eq!(
            kind_names(&ops),
            vec![
                "BoundedSource",
                "Process",
                "WindowKeyAssign",
                "KeyedWindowGroup",
                "ShardWriter",
            ]
        );
        let writer = ops.operators().last().unwrap();
        match &writer.kind {
            OperatorKind::ShardWriter {
                finalize_on_close, ..
            } => assert!(!finalize_on_close),
            other => panic!("expected ShardWriter, got {other:?}"),
        }

        let gbk = &ops.operators()[3];
        match &gbk.kind {
            OperatorKind::KeyedWindowGroup {
                strategy,
                single_pass,
            } => {
                assert_eq!(*strategy, hourly());
                assert!(single_pass);
            }
            other => panic!("expected KeyedWindowGroup, got {other:?}"),
        }
    }

    #[test]
    fn wiring_follows_logical_edges() {
        let g = windowed_graph(true);
        let ops = translate(&g, ExecutionMode::Batch).unwrap();
        assert_eq!(
            ops.edges(),
            &[
                (OpId(0), OpId(1)),
                (OpId(1), OpId(2)),
                (OpId(2), OpId(3)),
                (OpId(3), OpId(4)),
            ]
        );
    }

    #[test]
    fn translation_is_deterministic() {
        let a = translate(&windowed_graph(false), ExecutionMode::Streaming).unwrap();
        let b = translate(&windowed_graph(false), ExecutionMode::Streaming).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn unexpanded_composite_rejected() {
        let mut g = PipelineGraph::new();
        let src = g.add_node("src", source()).unwrap();
        let comp = g
            .add_node(
                "comp",
                TransformKind::Composite {
                    stages: vec![pardo()],
                },
            )
            .unwrap();
        let out = g.add_node("out", sink(false, None)).unwrap();
        g.add_edge(src, comp, CollectionSpec::bounded()).unwrap();
        g.add_edge(comp, out, CollectionSpec::bounded()).unwrap();
        g.finalize().unwrap();

        let err = translate(&g, ExecutionMode::Batch).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::UnexpandedComposite(name) if name == "comp"
        ));
    }

    #[test]
    fn inconsistent_windowing_rejected() {
        let mut g = PipelineGraph::new();
        let src = g.add_node("src", source()).unwrap();
        let win = g
            .add_node("win", TransformKind::WindowInto { strategy: hourly() })
            .unwrap();
        let out = g.add_node("out", sink(false, None)).unwrap();
        g.add_edge(src, win, CollectionSpec::bounded()).unwrap();
        // Output edge does not carry the assigned strategy.
        g.add_edge(win, out, CollectionSpec::bounded()).unwrap();
        g.finalize().unwrap();

        let err = translate(&g, ExecutionMode::Batch).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::InconsistentWindowing { node, .. } if node == "win"
        ));
    }

    #[test]
    fn zero_shard_sink_rejected() {
        let mut g = PipelineGraph::new();
        let src = g.add_node("src", source()).unwrap();
        let out = g.add_node("out", sink(false, Some(0))).unwrap();
        g.add_edge(src, out, CollectionSpec::bounded()).unwrap();
        g.finalize().unwrap();

        let err = translate(&g, ExecutionMode::Batch).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::MalformedNode { node, .. } if node == "out"
        ));
    }

    #[test]
    fn unwindowed_sink_has_no_pane_buffer_in_streaming() {
        let mut g = PipelineGraph::new();
        let src = g.add_node("src", source()).unwrap();
        let out = g.add_node("out", sink(false, None)).unwrap();
        g.add_edge(src, out, CollectionSpec::unbounded()).unwrap();
        g.finalize().unwrap();

        let ops = translate(&g, ExecutionMode::Streaming).unwrap();
        assert_eq!(kind_names(&ops), vec!["UnboundedSource", "ShardWriter"]);
    }
}
