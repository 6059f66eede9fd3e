//! An in-process engine for development and tests.
//!
//! `LocalEngine` runs a translated plan on a blocking worker thread,
//! interpreting operators in translation order. It honors the plan's
//! windowing semantics but simplifies the runtime: unbounded sources are
//! drained up to a configurable cap instead of running forever, and
//! triggers fire once at drain time.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use conflux_core::element::Element;
use conflux_core::engine::{Engine, ExecutionError, JobHandle, JobId, JobResult, SubmitError};
use conflux_core::graph::{merge_sessions, WindowKind, WindowSpan, WindowingStrategy};
use conflux_core::plan::{ExecTarget, ExecutionPlan, OperatorKind, OperatorNode};

/// Default number of elements drained from an unbounded source before the
/// local engine considers it exhausted.
pub const DEFAULT_UNBOUNDED_CAP: usize = 10_000;

/// In-process execution engine.
///
/// Accepts plans targeting local execution; cluster-targeted plans are
/// rejected at submission.
pub struct LocalEngine {
    unbounded_cap: usize,
    next_job: Mutex<u64>,
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEngine {
    /// Creates an engine with the default unbounded-source cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_unbounded_cap(DEFAULT_UNBOUNDED_CAP)
    }

    /// Creates an engine that drains at most `cap` elements from each
    /// unbounded source.
    #[must_use]
    pub fn with_unbounded_cap(cap: usize) -> Self {
        Self {
            unbounded_cap: cap,
            next_job: Mutex::new(0),
        }
    }

    fn next_job_id(&self) -> JobId {
        let mut next = self.next_job.lock();
        let id = JobId(*next);
        *next += 1;
        id
    }
}

#[async_trait]
impl Engine for LocalEngine {
    async fn submit(&self, plan: ExecutionPlan) -> Result<JobHandle, SubmitError> {
        if let ExecTarget::Cluster(addr) = plan.target() {
            return Err(SubmitError::TargetUnreachable(format!(
                "local engine cannot reach cluster at {addr}"
            )));
        }

        let id = self.next_job_id();
        let (tx, handle) = JobHandle::channel(id);
        let cap = self.unbounded_cap;
        tracing::info!(job = %id, mode = %plan.mode(), "job accepted");

        tokio::task::spawn_blocking(move || {
            let result = run_plan(&plan, cap);
            if let JobResult::Failed(err) = &result {
                tracing::error!(job = %id, error = %err, "job failed");
            }
            // Receiver may have been dropped; the job ran regardless.
            let _ = tx.send(result);
        });

        Ok(handle)
    }
}

/// An element tagged with the windows it currently belongs to.
///
/// Before any window assignment, every element lives in the single global
/// window.
#[derive(Clone, Debug)]
struct Tagged {
    element: Element,
    windows: Vec<WindowSpan>,
}

impl Tagged {
    fn fresh(element: Element) -> Self {
        Self {
            element,
            windows: vec![WindowSpan::global()],
        }
    }
}

fn run_plan(plan: &ExecutionPlan, unbounded_cap: usize) -> JobResult {
    let ops = plan.operators();
    let mut outputs: Vec<Vec<Tagged>> = Vec::with_capacity(ops.operators().len());

    // Operators are stored in topological order, so every input is
    // evaluated before its consumer.
    for op in ops.operators() {
        let mut input: Vec<Tagged> = Vec::new();
        for upstream in &op.inputs {
            input.extend_from_slice(&outputs[upstream.0 as usize]);
        }
        match eval_operator(op, input, unbounded_cap) {
            Ok(out) => outputs.push(out),
            Err(err) => return JobResult::Failed(err),
        }
    }

    JobResult::Succeeded
}

fn eval_operator(
    op: &OperatorNode,
    input: Vec<Tagged>,
    unbounded_cap: usize,
) -> Result<Vec<Tagged>, ExecutionError> {
    match &op.kind {
        OperatorKind::BoundedSource { factory } => Ok(factory().map(Tagged::fresh).collect()),

        OperatorKind::UnboundedSource { factory } => {
            Ok(factory().take(unbounded_cap).map(Tagged::fresh).collect())
        }

        OperatorKind::Process { func } => {
            let mut out = Vec::with_capacity(input.len());
            for tagged in input {
                let windows = tagged.windows;
                let produced =
                    func(tagged.element).map_err(|cause| ExecutionError::UserFunction {
                        operator: op.name.clone(),
                        cause: cause.to_string(),
                    })?;
                for element in produced {
                    out.push(Tagged {
                        element,
                        windows: windows.clone(),
                    });
                }
            }
            Ok(out)
        }

        OperatorKind::ContinuousWindowAssign { strategy }
        | OperatorKind::WindowKeyAssign { strategy } => Ok(input
            .into_iter()
            .map(|mut tagged| {
                tagged.windows = strategy.assign(tagged.element.timestamp).into_vec();
                tagged
            })
            .collect()),

        OperatorKind::KeyedWindowGroup { strategy, .. } => Ok(group(input, strategy)),

        // With the input fully drained every window has closed, so the
        // buffer reduces to ordering panes by window.
        OperatorKind::PaneBuffer { .. } => {
            let mut out = input;
            out.sort_by_key(|t| {
                (
                    t.windows.first().copied().unwrap_or_else(WindowSpan::global),
                    t.element.timestamp,
                )
            });
            Ok(out)
        }

        OperatorKind::ShardWriter {
            writer, num_shards, ..
        } => {
            let elements: Vec<Element> = input.into_iter().map(|t| t.element).collect();
            let shards = *num_shards as usize;
            for shard in 0..shards {
                let pane: Vec<Element> = elements
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i % shards == shard)
                    .map(|(_, e)| e.clone())
                    .collect();
                if pane.is_empty() && shard > 0 {
                    continue;
                }
                writer(&pane).map_err(|cause| ExecutionError::UserFunction {
                    operator: op.name.clone(),
                    cause: cause.to_string(),
                })?;
            }
            Ok(Vec::new())
        }
    }
}

/// Groups input by (key, window), emitting one element per group.
///
/// The group element carries the group key, the concatenation of member
/// values in timestamp order, and the largest member timestamp. Output is
/// ordered by key then window, so grouping is deterministic.
fn group(input: Vec<Tagged>, strategy: &WindowingStrategy) -> Vec<Tagged> {
    let session = matches!(strategy.kind, WindowKind::Session { .. });

    let mut groups: BTreeMap<(Option<Vec<u8>>, WindowSpan), Vec<Element>> = BTreeMap::new();

    if session {
        // Merge each key's proto windows into final sessions first, then
        // place every element in the session containing its timestamp.
        let mut proto: BTreeMap<Option<Vec<u8>>, Vec<WindowSpan>> = BTreeMap::new();
        for tagged in &input {
            proto
                .entry(tagged.element.key.clone())
                .or_default()
                .extend(tagged.windows.iter().copied());
        }
        let sessions: BTreeMap<Option<Vec<u8>>, Vec<WindowSpan>> = proto
            .into_iter()
            .map(|(key, spans)| (key, merge_sessions(spans)))
            .collect();
        for tagged in input {
            let key = tagged.element.key.clone();
            if let Some(span) = sessions
                .get(&key)
                .and_then(|s| s.iter().find(|s| s.contains(tagged.element.timestamp)))
            {
                groups.entry((key, *span)).or_default().push(tagged.element);
            }
        }
    } else {
        for tagged in input {
            for span in &tagged.windows {
                groups
                    .entry((tagged.element.key.clone(), *span))
                    .or_default()
                    .push(tagged.element.clone());
            }
        }
    }

    groups
        .into_iter()
        .map(|((key, span), mut members)| {
            members.sort_by_key(|e| e.timestamp);
            let timestamp = members.last().map_or(span.start, |e| e.timestamp);
            let value: Vec<u8> = members.into_iter().flat_map(|e| e.value).collect();
            Tagged {
                element: Element {
                    key,
                    value,
                    timestamp,
                },
                windows: vec![span],
            }
        })
        .collect()
}
