//! Pipeline translation: graph to executable plan.
//!
//! Translation runs a fixed sequence over a constructed pipeline graph:
//! composite expansion, execution-mode detection, durability policy
//! checks, transform-to-operator translation, and plan assembly. The
//! sequence either yields a complete [`Translation`] or the first error
//! encountered; no partial plan ever escapes.

mod error;
mod mode;
mod policy;
mod translator;

pub use error::TranslationError;
pub use mode::{detect, ExecutionMode};
pub use policy::{validate as validate_policy, Diagnostic, Severity, CHECKPOINTING_DISABLED_WARNING};
pub use translator::translate;

use crate::graph::{expand_composites, PipelineGraph};
use crate::options::PipelineOptions;
use crate::plan::{EnvironmentBuilder, ExecutionPlan};

/// The outcome of a successful translation: the executable plan plus any
/// non-fatal diagnostics raised along the way.
///
/// Diagnostics are also mirrored to the `tracing` subscriber as they are
/// raised, so callers that ignore this field still get them logged.
#[derive(Debug)]
pub struct Translation {
    /// The assembled execution plan.
    pub plan: ExecutionPlan,
    /// Non-fatal findings, in the order they were raised.
    pub diagnostics: Vec<Diagnostic>,
}

/// Translates a finalized pipeline graph into an execution plan under the
/// given options.
///
/// Composites are expanded first, then the execution mode is detected
/// from collection boundedness, the checkpoint policy is checked, every
/// primitive transform is mapped to native operators, and the plan is
/// assembled with the resolved target and parallelism.
///
/// # Errors
///
/// Returns [`crate::Error`] if the graph is structurally invalid, a
/// transform cannot be translated, or the options are inconsistent.
pub fn translate_pipeline(
    graph: &PipelineGraph,
    options: &PipelineOptions,
) -> Result<Translation, crate::Error> {
    let expanded = expand_composites(graph).map_err(report)?;
    let mode = mode::detect(&expanded);
    tracing::info!(%mode, nodes = expanded.node_count(), "translating pipeline");

    let mut diagnostics = Vec::new();
    if let Some(diag) = policy::validate(mode, &options.checkpoint_config()) {
        diagnostics.push(diag);
    }

    let operators = translator::translate(&expanded, mode).map_err(report)?;
    let plan = EnvironmentBuilder::new(options.clone())
        .build(operators, mode)
        .map_err(report)?;

    Ok(Translation { plan, diagnostics })
}

/// Mirrors a fatal translation error onto the `tracing` stream before it
/// propagates, so log subscribers see failures as well as warnings.
fn report<E: Into<crate::Error>>(err: E) -> crate::Error {
    let err = err.into();
    tracing::error!(error = %err, "pipeline translation failed");
    err
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::element::Element;
    use crate::graph::{CollectionSpec, TransformKind};

    /// Buffers log output so tests can assert on emitted records.
    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CaptureWriter {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn linear_graph(bounded: bool) -> PipelineGraph {
        let spec = if bounded {
            CollectionSpec::bounded()
        } else {
            CollectionSpec::unbounded()
        };
        let mut g = PipelineGraph::new();
        let src = g
            .add_node(
                "src",
                TransformKind::Source {
                    factory: Arc::new(|| Box::new(std::iter::empty())),
                },
            )
            .unwrap();
        let out = g
            .add_node(
                "out",
                TransformKind::Sink {
                    writer: Arc::new(|_: &[Element]| Ok(())),
                    windowed: false,
                    num_shards: None,
                },
            )
            .unwrap();
        g.add_edge(src, out, spec).unwrap();
        g.finalize().unwrap();
        g
    }

    #[test]
    fn bounded_pipeline_yields_batch_plan() {
        let t = translate_pipeline(&linear_graph(true), &PipelineOptions::default()).unwrap();
        assert!(!t.plan.mode().is_streaming());
        assert!(t.diagnostics.is_empty());
        assert_eq!(t.plan.operators().len(), 2);
    }

    #[test]
    fn unbounded_pipeline_without_checkpointing_warns() {
        let t = translate_pipeline(&linear_graph(false), &PipelineOptions::default()).unwrap();
        assert!(t.plan.mode().is_streaming());
        assert_eq!(t.diagnostics.len(), 1);
        assert_eq!(t.diagnostics[0].message, CHECKPOINTING_DISABLED_WARNING);
    }

    #[test]
    fn unbounded_pipeline_with_checkpointing_is_quiet() {
        let opts =
            PipelineOptions::default().with_checkpointing(std::time::Duration::from_secs(5));
        let t = translate_pipeline(&linear_graph(false), &opts).unwrap();
        assert!(t.diagnostics.is_empty());
    }

    #[test]
    fn composite_pipelines_translate_like_their_expansion() {
        let mut composite = PipelineGraph::new();
        let src = composite
            .add_node(
                "read",
                TransformKind::Source {
                    factory: Arc::new(|| Box::new(std::iter::empty())),
                },
            )
            .unwrap();
        let chain = composite
            .add_node(
                "chain",
                TransformKind::Composite {
                    stages: vec![
                        TransformKind::ParDo {
                            func: Arc::new(|e: Element| Ok(vec![e])),
                        },
                        TransformKind::ParDo {
                            func: Arc::new(|e: Element| Ok(vec![e])),
                        },
                    ],
                },
            )
            .unwrap();
        let out = composite
            .add_node(
                "write",
                TransformKind::Sink {
                    writer: Arc::new(|_: &[Element]| Ok(())),
                    windowed: false,
                    num_shards: None,
                },
            )
            .unwrap();
        composite
            .add_edge(src, chain, CollectionSpec::bounded())
            .unwrap();
        composite
            .add_edge(chain, out, CollectionSpec::bounded())
            .unwrap();
        composite.finalize().unwrap();

        let t = translate_pipeline(&composite, &PipelineOptions::default()).unwrap();
        let names: Vec<_> = t
            .plan
            .operators()
            .operators()
            .iter()
            .map(|o| o.kind.name())
            .collect();
        assert_eq!(
            names,
            vec!["BoundedSource", "Process", "Process", "ShardWriter"]
        );
    }

    #[test]
    fn fatal_translation_errors_reach_the_log_stream() {
        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_ansi(false)
            .finish();

        let err = tracing::subscriber::with_default(subscriber, || {
            translate_pipeline(&PipelineGraph::new(), &PipelineOptions::default()).unwrap_err()
        });
        assert!(matches!(err, crate::Error::Graph(_)));

        let logs = writer.contents();
        assert!(logs.contains("pipeline translation failed"));
        assert!(logs.contains("empty graph"));
    }

    #[test]
    fn invalid_options_failure_is_logged_too() {
        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_ansi(false)
            .finish();

        let options = PipelineOptions::default().with_parallelism(0);
        let err = tracing::subscriber::with_default(subscriber, || {
            translate_pipeline(&linear_graph(true), &options).unwrap_err()
        });
        assert!(matches!(err, crate::Error::Options(_)));
        assert!(writer.contents().contains("pipeline translation failed"));
    }
}
