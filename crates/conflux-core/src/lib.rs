//! # Conflux Core
//!
//! The translation core for Conflux: turns a portable, engine-agnostic
//! pipeline graph into a concrete execution plan for a streaming/batch
//! engine, then hands it off for submission.
//!
//! This crate provides:
//! - **Graph model**: the pipeline DAG of transforms and logical collections
//! - **Mode detection**: derives `Streaming` vs `Batch` from edge boundedness
//! - **Checkpoint policy**: warns when streaming pipelines lack checkpointing
//! - **Transform translation**: maps transforms onto native engine operators,
//!   preserving windowing and trigger semantics
//! - **Environment building**: assembles the submittable execution plan
//! - **Engine seam**: the async submit/await-result boundary
//!
//! ## Design Principles
//!
//! 1. **Translation is pure** - no I/O, wall-clock, or randomness in
//!    structural decisions; the same graph and options always yield a
//!    topologically identical plan
//! 2. **User logic is opaque** - per-element functions, source factories,
//!    and sink writers are carried as data and never invoked here
//! 3. **No partial plans** - translation fails fast on a malformed node;
//!    whatever reaches an engine is complete
//!
//! ## Example
//!
//! ```rust,ignore
//! use conflux_core::translate::translate_pipeline;
//!
//! let translation = translate_pipeline(&graph, &options)?;
//! for diag in &translation.diagnostics {
//!     eprintln!("{diag}");
//! }
//! engine.submit(translation.plan).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod element;
pub mod engine;
pub mod graph;
pub mod options;
pub mod plan;
pub mod translate;

// Re-export the common entry points
pub use graph::PipelineGraph;
pub use options::PipelineOptions;
pub use plan::ExecutionPlan;
pub use translate::{translate_pipeline, Translation};

/// Result type for conflux-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for conflux-core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Graph construction or validation errors
    #[error("Graph error: {0}")]
    Graph(#[from] graph::GraphError),

    /// Transform translation errors
    #[error("Translation error: {0}")]
    Translation(#[from] translate::TranslationError),

    /// Pipeline option errors
    #[error("Options error: {0}")]
    Options(#[from] options::OptionsError),
}
