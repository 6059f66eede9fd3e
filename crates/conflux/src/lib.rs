//! # Conflux
//!
//! Portable dataflow pipelines on streaming/batch engines. Build a
//! pipeline graph once, let translation detect the execution mode from
//! collection boundedness, and submit the resulting plan to any engine.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use conflux::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut graph = PipelineGraph::new();
//!     let src = graph.add_node("numbers", TransformKind::Source {
//!         factory: Arc::new(|| Box::new((0..100).map(|i| {
//!             Element::new(i.to_string().into_bytes(), i * 1_000)
//!         }))),
//!     })?;
//!     let out = graph.add_node("print", TransformKind::Sink {
//!         writer: Arc::new(|batch| { println!("{} elements", batch.len()); Ok(()) }),
//!         windowed: false,
//!         num_shards: None,
//!     })?;
//!     graph.add_edge(src, out, CollectionSpec::bounded())?;
//!     graph.finalize()?;
//!
//!     let runner = PipelineRunner::new(LocalEngine::new());
//!     let result = runner.run(&graph, &PipelineOptions::default()).await?;
//!     assert!(result.is_success());
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

mod local;
mod runner;

// Re-export the translation core
pub use conflux_core::*;

pub use local::LocalEngine;
pub use runner::{PipelineRunner, RunnerError};

/// Commonly used types and traits.
///
/// ```rust,ignore
/// use conflux::prelude::*;
/// ```
pub mod prelude {
    // Graph construction
    pub use conflux_core::graph::{
        CollectionSpec, PipelineGraph, TransformKind, Trigger, WindowKind, WindowingStrategy,
    };

    // Elements and user-logic signatures
    pub use conflux_core::element::{DoFn, DoFnError, Element, SinkWriter, SourceFactory};

    // Options and translation
    pub use conflux_core::options::{PipelineOptions, RunnerTarget};
    pub use conflux_core::translate::{translate_pipeline, ExecutionMode, Translation};

    // Execution
    pub use conflux_core::engine::{Engine, JobHandle, JobResult};
    pub use conflux_core::plan::ExecutionPlan;

    pub use crate::{LocalEngine, PipelineRunner};

    // Standard library re-exports for convenience
    pub use std::sync::Arc;
    pub use std::time::Duration;
}
