//! The pipeline runner: translate-then-submit over any engine.

use thiserror::Error;

use conflux_core::engine::{Engine, JobHandle, JobResult, SubmitError};
use conflux_core::graph::PipelineGraph;
use conflux_core::options::PipelineOptions;
use conflux_core::translate::{translate_pipeline, Translation};

/// Errors from running a pipeline end to end.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The pipeline could not be translated.
    #[error(transparent)]
    Translate(#[from] conflux_core::Error),

    /// Translation succeeded but the engine refused the plan.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Drives a pipeline through translation and submission on one engine.
///
/// The runner owns the engine; clone-cheap engines can be shared across
/// runners if needed.
pub struct PipelineRunner<E> {
    engine: E,
}

impl<E: Engine> PipelineRunner<E> {
    /// Creates a runner over the given engine.
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Translates the graph without submitting it.
    ///
    /// Useful for inspecting the plan or collecting diagnostics before
    /// committing to execution.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Translate`] if translation fails.
    pub fn translate(
        &self,
        graph: &PipelineGraph,
        options: &PipelineOptions,
    ) -> Result<Translation, RunnerError> {
        Ok(translate_pipeline(graph, options)?)
    }

    /// Translates and submits the pipeline, returning the job handle.
    ///
    /// Any diagnostics raised during translation have already been logged
    /// by the time this returns; use [`translate`](Self::translate) first
    /// to inspect them programmatically.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if translation fails or the engine refuses
    /// the plan.
    pub async fn submit(
        &self,
        graph: &PipelineGraph,
        options: &PipelineOptions,
    ) -> Result<JobHandle, RunnerError> {
        let translation = self.translate(graph, options)?;
        let handle = self.engine.submit(translation.plan).await?;
        tracing::info!(job = %handle.id(), "pipeline submitted");
        Ok(handle)
    }

    /// Translates, submits, and waits for the terminal job result.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if translation or submission fails. Job
    /// failures during execution are reported through the returned
    /// [`JobResult`], not as an error here.
    pub async fn run(
        &self,
        graph: &PipelineGraph,
        options: &PipelineOptions,
    ) -> Result<JobResult, RunnerError> {
        let handle = self.submit(graph, options).await?;
        Ok(handle.await_result().await)
    }
}
