//! Composite transform expansion.
//!
//! A composite node is a named chain of transforms. Expansion rewrites the
//! graph so every composite is replaced by its primitive stages, rewiring
//! the composite's input and output collections to the first and last stage
//! respectively. Translation only ever sees the expanded graph.

use fxhash::FxHashMap;

use super::error::GraphError;
use super::topology::{CollectionSpec, NodeId, PipelineGraph, TransformKind};
use super::window::WindowingStrategy;

/// Expands all composite nodes into their primitive stages.
///
/// The returned graph is finalized and structurally equivalent to the
/// input with every composite spliced out. Node and edge identifiers are
/// renumbered; equivalence is topological, not identity-based. Expanding a
/// graph that contains only primitive nodes yields an equivalent graph.
///
/// # Errors
///
/// Returns `GraphError::InvalidComposite` if a composite is empty, begins
/// with a source stage while consuming an input, or consumes no input
/// without beginning with a source stage. Propagates validation errors
/// from finalizing the expanded graph.
pub fn expand_composites(graph: &PipelineGraph) -> Result<PipelineGraph, GraphError> {
    let mut expanded = PipelineGraph::new();

    // Maps old node -> new node receiving its inputs / producing its outputs.
    let mut in_map: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut out_map: FxHashMap<NodeId, NodeId> = FxHashMap::default();

    let mut node_ids: Vec<NodeId> = graph.nodes().keys().copied().collect();
    node_ids.sort_by_key(|n| n.0);

    for old_id in &node_ids {
        let node = graph
            .node(*old_id)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{old_id}")))?;

        match &node.kind {
            TransformKind::Composite { stages } => {
                let mut flat = Vec::new();
                flatten_stages(&node.name, stages, &mut flat)?;
                if flat.is_empty() {
                    return Err(GraphError::InvalidComposite {
                        node: node.name.clone(),
                        reason: "composite has no stages".to_string(),
                    });
                }

                let consumes_input = !node.inputs.is_empty();
                let starts_with_source = matches!(flat[0].1, TransformKind::Source { .. });
                if consumes_input && starts_with_source {
                    return Err(GraphError::InvalidComposite {
                        node: node.name.clone(),
                        reason: "a consuming composite cannot begin with a source stage"
                            .to_string(),
                    });
                }
                if !consumes_input && !starts_with_source {
                    return Err(GraphError::InvalidComposite {
                        node: node.name.clone(),
                        reason: "a composite with no inputs must begin with a source stage"
                            .to_string(),
                    });
                }

                // Intermediate collections inherit boundedness from the
                // composite's surroundings and track re-windowing stages.
                let first_input = node.inputs.first().and_then(|id| graph.edge(*id));
                let bounded = first_input.map_or_else(
                    || {
                        node.outputs
                            .first()
                            .and_then(|id| graph.edge(*id))
                            .map_or(true, |e| e.spec.bounded)
                    },
                    |e| e.spec.bounded,
                );
                let mut windowing = first_input
                    .map_or_else(WindowingStrategy::global, |e| e.spec.windowing);

                let mut prev: Option<NodeId> = None;
                for (stage_name, stage_kind) in flat {
                    let stage_windowing =
                        if let TransformKind::WindowInto { strategy } = &stage_kind {
                            Some(*strategy)
                        } else {
                            None
                        };
                    let new_id = expanded.add_node(stage_name, stage_kind)?;
                    if let Some(prev_id) = prev {
                        let spec = CollectionSpec {
                            bounded,
                            windowing,
                            ..CollectionSpec::default()
                        };
                        expanded.add_edge(prev_id, new_id, spec)?;
                    }
                    if let Some(strategy) = stage_windowing {
                        windowing = strategy;
                    }
                    if prev.is_none() {
                        in_map.insert(*old_id, new_id);
                    }
                    prev = Some(new_id);
                }
                // `flat` is non-empty, so `prev` is always set here.
                if let Some(last) = prev {
                    out_map.insert(*old_id, last);
                }
            }
            kind => {
                let new_id = expanded.add_node(node.name.clone(), kind.clone())?;
                in_map.insert(*old_id, new_id);
                out_map.insert(*old_id, new_id);
            }
        }
    }

    let mut edge_ids: Vec<_> = graph.edges().keys().copied().collect();
    edge_ids.sort_by_key(|e| e.0);

    for edge_id in edge_ids {
        let edge = graph
            .edge(edge_id)
            .ok_or_else(|| GraphError::NodeNotFound(format!("{edge_id}")))?;
        let source = out_map
            .get(&edge.source)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(format!("{}", edge.source)))?;
        let target = in_map
            .get(&edge.target)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(format!("{}", edge.target)))?;
        expanded.add_edge(source, target, edge.spec.clone())?;
    }

    expanded.finalize()?;
    Ok(expanded)
}

/// Recursively flattens nested composites into `(name, primitive_kind)`
/// pairs, naming stages by path (`outer/0`, `outer/1/2`, ...).
fn flatten_stages(
    prefix: &str,
    stages: &[TransformKind],
    out: &mut Vec<(String, TransformKind)>,
) -> Result<(), GraphError> {
    for (idx, stage) in stages.iter().enumerate() {
        let name = format!("{prefix}/{idx}");
        match stage {
            TransformKind::Composite { stages: nested } => {
                flatten_stages(&name, nested, out)?;
            }
            primitive => out.push((name, primitive.clone())),
        }
    }
    Ok(())
}
