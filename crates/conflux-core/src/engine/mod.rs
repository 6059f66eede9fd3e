//! The engine seam: asynchronous plan submission and job observation.
//!
//! Translation produces an [`ExecutionPlan`](crate::plan::ExecutionPlan);
//! an [`Engine`] accepts it and runs it. Submission returns a
//! [`JobHandle`] immediately so callers can detach or await the terminal
//! [`JobResult`]. Engines report results exactly once over a oneshot
//! channel owned by the handle.

mod error;

pub use error::{ExecutionError, SubmitError};

use std::fmt;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::plan::ExecutionPlan;

/// Unique identifier of a submitted job, assigned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Terminal outcome of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// The job ran to completion. For streaming jobs this means the
    /// engine drained the pipeline and shut it down cleanly.
    Succeeded,
    /// The job failed; the cause names the first error observed.
    Failed(ExecutionError),
}

impl JobResult {
    /// Returns whether the job completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// A handle to a submitted job.
///
/// Holds the receiving end of the engine's result channel. Dropping the
/// handle detaches from the job without cancelling it.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    rx: oneshot::Receiver<JobResult>,
}

impl JobHandle {
    /// Creates a handle and the sender the engine reports the terminal
    /// result on.
    #[must_use]
    pub fn channel(id: JobId) -> (oneshot::Sender<JobResult>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { id, rx })
    }

    /// The engine-assigned job identifier.
    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Waits for the job to reach a terminal state.
    ///
    /// If the engine drops its sender without reporting, the job outcome
    /// is unknowable and this resolves to a [`ExecutionError::Disconnected`]
    /// failure.
    pub async fn await_result(self) -> JobResult {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => JobResult::Failed(ExecutionError::Disconnected),
        }
    }
}

/// An execution engine that accepts translated plans.
///
/// `submit` returns as soon as the job is accepted; execution proceeds in
/// the background and the terminal outcome arrives through the returned
/// [`JobHandle`].
#[async_trait]
pub trait Engine: Send + Sync {
    /// Submits a plan for execution.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] if the target is unreachable or the engine
    /// refuses the plan. Submission errors mean the job never started.
    async fn submit(&self, plan: ExecutionPlan) -> Result<JobHandle, SubmitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_resolves_reported_result() {
        let (tx, handle) = JobHandle::channel(JobId(7));
        assert_eq!(handle.id(), JobId(7));
        tx.send(JobResult::Succeeded).unwrap();
        assert!(handle.await_result().await.is_success());
    }

    #[tokio::test]
    async fn dropped_sender_yields_disconnected_failure() {
        let (tx, handle) = JobHandle::channel(JobId(1));
        drop(tx);
        assert_eq!(
            handle.await_result().await,
            JobResult::Failed(ExecutionError::Disconnected)
        );
    }
}
